//! Test doubles for the generation and image-search boundaries.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::generation::{GenerateOptions, GenerationClient, GenerationError};
use crate::images::{ImageSearch, ImageSearchError};

/// One recorded generation call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub options: GenerateOptions,
}

type Responder =
    Box<dyn Fn(&str, &str, &GenerateOptions) -> Result<String, GenerationError> + Send + Sync>;

/// Generation client whose answers come from a closure over (system, user, options).
pub struct ScriptedClient {
    responder: Responder,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &str, &GenerateOptions) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the same text.
    pub fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _, _| Ok(text.clone()))
    }

    /// Answers the classifier call with `action` and every other call with `reply`.
    pub fn with_action(action: &str, reply: &str) -> Self {
        let classification = format!(r#"{{"action": "{}"}}"#, action);
        let reply = reply.to_string();
        Self::new(move |system, _, _| {
            if is_classifier_prompt(system) {
                Ok(classification.clone())
            } else {
                Ok(reply.clone())
            }
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// The classifier system prompt is the only one listing the action vocabulary.
pub fn is_classifier_prompt(system: &str) -> bool {
    system.contains("find_multiple_images")
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        options: &GenerateOptions,
    ) -> Result<String, GenerationError> {
        self.calls.lock().push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
            options: options.clone(),
        });
        (self.responder)(system, user, options)
    }
}

/// Image search returning a fixed list, or failing.
pub struct FakeImages {
    urls: Vec<String>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn with_urls(urls: &[&str]) -> Self {
        Self {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_urls(&[])
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ImageSearch for FakeImages {
    async fn search(&self, query: &str) -> Result<Vec<String>, ImageSearchError> {
        self.queries.lock().push(query.to_string());
        if self.fail {
            return Err(ImageSearchError::TokenNotFound);
        }
        Ok(self.urls.clone())
    }
}
