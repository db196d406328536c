//! Intent classification of operator requests.
//!
//! One JSON-mode generation call maps a free-text request onto a closed set of
//! actions. Anything that goes wrong degrades to [`Action::Chat`]; the classifier
//! never fails a request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EnrichError;
use crate::generation::{GenerateOptions, GenerationClient};
use crate::parser::parse_json_object;

/// What a request asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    GenerateDescription,
    FindImage,
    FindMultipleImages,
    GenerateKeywords,
    GenerateSeo,
    GenerateAll,
    ExtractParameters,
    UpdateParameter,
    Chat,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::GenerateDescription,
        Action::FindImage,
        Action::FindMultipleImages,
        Action::GenerateKeywords,
        Action::GenerateSeo,
        Action::GenerateAll,
        Action::ExtractParameters,
        Action::UpdateParameter,
        Action::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateDescription => "generate_description",
            Self::FindImage => "find_image",
            Self::FindMultipleImages => "find_multiple_images",
            Self::GenerateKeywords => "generate_keywords",
            Self::GenerateSeo => "generate_seo",
            Self::GenerateAll => "generate_all",
            Self::ExtractParameters => "extract_parameters",
            Self::UpdateParameter => "update_parameter",
            Self::Chat => "chat",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == label)
            .ok_or_else(|| format!("unknown action: {}", s.trim()))
    }
}

fn classifier_system_prompt() -> String {
    let labels = Action::ALL
        .iter()
        .map(Action::as_str)
        .collect::<Vec<_>>()
        .join("|");
    format!(
        "Decide what the operator wants done with this catalog item. \
         Use find_multiple_images when several pictures are requested and find_image for one. \
         Use update_parameter when a single named attribute should be set, extract_parameters \
         when attributes should be gathered from the product itself, generate_all when every \
         missing field should be filled, and chat for questions or anything else. \
         Respond with JSON only: {{\"action\": \"{}\"}}",
        labels
    )
}

/// Classify a request, surfacing every failure.
///
/// Missing `action` key or an unknown label yields [`EnrichError::Validation`].
pub async fn classify_strict(
    client: &dyn GenerationClient,
    record_name: &str,
    request: &str,
) -> Result<Action, EnrichError> {
    let user = format!("Product: {}. Request: {}", record_name, request);
    let text = client
        .generate(&classifier_system_prompt(), &user, &GenerateOptions::json(None))
        .await?;

    let map = parse_json_object(&text)?;
    let label = match map.get("action") {
        Some(Value::String(s)) => s.as_str(),
        Some(_) => return Err(EnrichError::Validation("'action' is not a string".into())),
        None => return Err(EnrichError::Validation("missing 'action' key".into())),
    };
    label.parse::<Action>().map_err(EnrichError::Validation)
}

/// Classify a request; falls back to [`Action::Chat`] on any failure.
pub async fn classify(client: &dyn GenerationClient, record_name: &str, request: &str) -> Action {
    match classify_strict(client, record_name, request).await {
        Ok(action) => {
            log::debug!("Classified request for '{}' as {}", record_name, action);
            action
        }
        Err(e) => {
            log::warn!(
                "Intent classification failed for '{}', falling back to chat: {}",
                record_name,
                e
            );
            Action::Chat
        }
    }
}
