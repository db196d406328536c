//! Error types for the enrichment pipeline
//!
//! Errors are classified by recoverability:
//! - Retryable: transport failures, timeouts, rate limits
//! - NonRetryable: malformed output, missing records, storage failures
//! - RequiresUserAction: missing API key

use thiserror::Error;

use crate::db::StoreError;
use crate::generation::GenerationError;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Failed to parse generation output: {0}")]
    Parse(String),

    #[error("Invalid generation output: {0}")]
    Validation(String),

    #[error("Record not found: {0}")]
    RecordNotFound(i64),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl EnrichError {
    /// Returns true if running the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EnrichError::Generation(GenerationError::RetriesExhausted { .. }) => true,
            EnrichError::Generation(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns true if this error needs operator action to resolve.
    pub fn requires_user_action(&self) -> bool {
        matches!(self, EnrichError::Generation(GenerationError::MissingApiKey))
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EnrichError::Generation(GenerationError::MissingApiKey) => {
                "Set apiKey in ~/.catalog-enrich/config.json or export OPENAI_API_KEY."
            }
            EnrichError::Generation(GenerationError::Status { status: 401, .. }) => {
                "The API key was rejected. Check it is valid."
            }
            EnrichError::Generation(_) if self.is_retryable() => {
                "The generation service is busy or unreachable. Wait a minute and try again."
            }
            EnrichError::Generation(_) => "The generation service returned no usable text. Try again.",
            EnrichError::Parse(_) | EnrichError::Validation(_) => {
                "The model answered in an unexpected format. Rephrase the request and try again."
            }
            EnrichError::RecordNotFound(_) => "Check the record id.",
            EnrichError::Store(_) => "Check the catalog database path and permissions.",
        }
    }
}

/// Serializable error representation for callers that display failures.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichFailure {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&EnrichError> for EnrichFailure {
    fn from(err: &EnrichError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        EnrichFailure {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
