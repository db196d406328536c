//! Operator chat session for one record.
//!
//! A transcript of requests and replies, owned by the caller. Nothing here is
//! persisted; a fresh session starts empty.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enrich::{EnrichOutcome, Enricher};
use crate::error::{EnrichError, EnrichFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Operator,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub record_id: i64,
    entries: Vec<TranscriptEntry>,
}

impl ChatSession {
    pub fn new(record_id: i64) -> Self {
        Self {
            record_id,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, speaker: Speaker, text: &str) {
        self.entries.push(TranscriptEntry {
            speaker,
            text: text.to_string(),
            at: Utc::now(),
        });
    }

    /// Send one request through the pipeline and record both sides.
    ///
    /// Failures are recorded as an assistant line too, then returned.
    pub async fn ask(&mut self, enricher: &Enricher, request: &str) -> Result<EnrichOutcome, EnrichError> {
        self.push(Speaker::Operator, request);
        match enricher.process_request(self.record_id, request).await {
            Ok(outcome) => {
                self.push(Speaker::Assistant, &outcome.message);
                Ok(outcome)
            }
            Err(e) => {
                let failure = EnrichFailure::from(&e);
                self.push(
                    Speaker::Assistant,
                    &format!("Error: {} {}", failure.message, failure.recovery_suggestion),
                );
                Err(e)
            }
        }
    }
}
