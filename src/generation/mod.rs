//! Generation client boundary.
//!
//! Everything that talks to the remote text-generation service goes through
//! [`GenerationClient`]. The production implementation is
//! [`responses::ResponsesClient`] (OpenAI Responses API over reqwest); tests
//! plug in scripted doubles.
//!
//! Modules:
//! - responses: HTTP client, request payload, response envelope decoding

pub mod responses;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use responses::ResponsesClient;

// ============================================================================
// Options
// ============================================================================

/// Reasoning effort forwarded as `reasoning.effort`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Per-call options.
///
/// `web_search` and `max_output_tokens` do not combine: the remote service
/// rejects a token cap on search-augmented calls, so the payload builder drops
/// the cap whenever search is on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub json_mode: bool,
    pub max_output_tokens: Option<u32>,
    pub reasoning_effort: ReasoningEffort,
    pub web_search: bool,
}

impl GenerateOptions {
    /// Plain text output, optionally capped.
    pub fn text(max_output_tokens: Option<u32>) -> Self {
        Self {
            max_output_tokens,
            ..Self::default()
        }
    }

    /// Output constrained to a JSON object.
    pub fn json(max_output_tokens: Option<u32>) -> Self {
        Self {
            json_mode: true,
            max_output_tokens,
            ..Self::default()
        }
    }

    /// Search-augmented call. Never carries a token cap.
    pub fn web_search(reasoning_effort: ReasoningEffort) -> Self {
        Self {
            web_search: true,
            reasoning_effort,
            ..Self::default()
        }
    }

    /// Token cap actually sent to the service.
    pub fn effective_max_output_tokens(&self) -> Option<u32> {
        if self.web_search {
            None
        } else {
            self.max_output_tokens
        }
    }
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("No API key configured for the generation service")]
    MissingApiKey,
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Generation request timed out after {0} seconds")]
    Timeout(u64),
    #[error("Generation API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Generation response contained no text output")]
    EmptyOutput,
    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),
    #[error("Generation request failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl GenerationError {
    /// Transient failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            _ => false,
        }
    }
}

// ============================================================================
// Retry policy
// ============================================================================

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Run `attempt` until it succeeds, fails non-transiently, or the policy is
/// exhausted.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, GenerationError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, GenerationError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error: Option<GenerationError> = None;

    for n in 1..=attempts {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                if n < attempts {
                    log::warn!(
                        "{} retry {}/{} after transient error: {} (sleep {:?})",
                        label,
                        n,
                        attempts,
                        err,
                        policy.delay
                    );
                    tokio::time::sleep(policy.delay).await;
                }
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(GenerationError::RetriesExhausted {
        attempts,
        last: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string()),
    })
}

// ============================================================================
// Client trait
// ============================================================================

/// Boundary to the remote text-generation service.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send a system/user prompt pair and return the first text output.
    async fn generate(
        &self,
        system: &str,
        user: &str,
        options: &GenerateOptions,
    ) -> Result<String, GenerationError>;
}
