//! Single-record enrichment pipeline.
//!
//! load record → classify → route → generate → merge → write.
//!
//! Store access is synchronous and never spans a generation call, so two
//! concurrent runs on the same record only compete for still-empty fields.

pub mod dispatch;
pub mod generators;
pub mod prompts;

use std::sync::Arc;

use serde::Serialize;

use crate::db::{Record, RecordField};
use crate::error::EnrichError;
use crate::generation::GenerationClient;
use crate::images::ImageSearch;
use crate::intent::{self, Action};
use crate::merge::{merge_attributes, plan_field_updates, AttributeStats};
use crate::store::RecordStore;
use crate::types::EnrichConfig;

use self::dispatch::Route;
use self::generators::{Candidate, GeneratorContext};

/// What one request did to one record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichOutcome {
    pub record_id: i64,
    pub action: Action,
    pub updated_fields: Vec<RecordField>,
    pub attributes: AttributeStats,
    pub message: String,
}

pub struct Enricher {
    client: Arc<dyn GenerationClient>,
    images: Arc<dyn ImageSearch>,
    store: Arc<dyn RecordStore>,
    config: EnrichConfig,
}

impl Enricher {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        images: Arc<dyn ImageSearch>,
        store: Arc<dyn RecordStore>,
        config: EnrichConfig,
    ) -> Self {
        Self {
            client,
            images,
            store,
            config,
        }
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Classify `request` and carry it out against one record.
    pub async fn process_request(&self, record_id: i64, request: &str) -> Result<EnrichOutcome, EnrichError> {
        let record = self.load(record_id)?;
        let action = intent::classify(self.client.as_ref(), &record.name, request).await;
        log::info!("Record {} ('{}'): {}", record.id, record.name, action);
        self.run_action(&record, action, request).await
    }

    /// Carry out an already known action, skipping classification.
    pub async fn process_action(
        &self,
        record_id: i64,
        action: Action,
        request: &str,
    ) -> Result<EnrichOutcome, EnrichError> {
        let record = self.load(record_id)?;
        self.run_action(&record, action, request).await
    }

    fn load(&self, record_id: i64) -> Result<Record, EnrichError> {
        self.store
            .find_by_id(record_id)?
            .ok_or(EnrichError::RecordNotFound(record_id))
    }

    async fn run_action(&self, record: &Record, action: Action, request: &str) -> Result<EnrichOutcome, EnrichError> {
        let route = dispatch::route(action);
        let attributes = self.store.list_attributes(record.id)?;

        let ctx = GeneratorContext {
            client: self.client.as_ref(),
            images: self.images.as_ref(),
            config: &self.config,
            record,
            attributes: &attributes,
            request,
        };
        let candidate = generators::generate(route.generator, &ctx).await?;

        self.apply(record.id, action, &route, &candidate)
    }

    /// Merge a candidate into the record as it is stored now.
    fn apply(
        &self,
        record_id: i64,
        action: Action,
        route: &Route,
        candidate: &Candidate,
    ) -> Result<EnrichOutcome, EnrichError> {
        let current = self.load(record_id)?;

        let updates = plan_field_updates(&current, &candidate.fields, route.fields);
        let updated_fields: Vec<RecordField> = updates.keys().copied().collect();
        if !updates.is_empty() {
            self.store.update(record_id, &updates)?;
        }

        let stats = match (route.attributes, candidate.attributes.as_ref()) {
            (Some(mode), Some(attrs)) => merge_attributes(self.store.as_ref(), record_id, attrs, mode)?,
            _ => AttributeStats::default(),
        };

        let message = describe(action, candidate, &updated_fields, &stats);
        log::info!("Record {} {}: {}", record_id, action, message);

        Ok(EnrichOutcome {
            record_id,
            action,
            updated_fields,
            attributes: stats,
            message,
        })
    }
}

/// Operator feedback for one outcome.
fn describe(action: Action, candidate: &Candidate, updated: &[RecordField], stats: &AttributeStats) -> String {
    if let Some(note) = &candidate.note {
        return note.clone();
    }

    match action {
        Action::FindImage | Action::FindMultipleImages => {
            if updated.contains(&RecordField::ImageLink) {
                let count = candidate
                    .fields
                    .get(RecordField::ImageLink.column())
                    .map(|v| v.split('|').count())
                    .unwrap_or(0);
                format!("{} image(s) found and saved", count)
            } else {
                "Image link is already filled".to_string()
            }
        }
        Action::UpdateParameter => {
            let Some((name, value)) = candidate.attributes.as_ref().and_then(|a| a.iter().next()) else {
                return "No attribute changed".to_string();
            };
            if stats.created > 0 {
                format!("'{}' created: '{}'", name, value)
            } else if stats.updated > 0 {
                format!("'{}' updated: '{}'", name, value)
            } else {
                format!("'{}' is already '{}'", name, value)
            }
        }
        Action::ExtractParameters => format!(
            "Attributes: {} created, {} updated, {} unchanged",
            stats.created, stats.updated, stats.unchanged
        ),
        _ => {
            let mut parts: Vec<String> = updated.iter().map(|f| f.label().to_string()).collect();
            if stats.created > 0 {
                parts.push(format!("{} new attribute(s)", stats.created));
            }
            if parts.is_empty() {
                "All fields are already filled".to_string()
            } else {
                format!("Updated: {}", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use super::Enricher;
    use crate::generation::GenerationClient;
    use crate::images::ImageSearch;
    use crate::store::test_utils::test_store;
    use crate::store::SqliteStore;
    use crate::types::EnrichConfig;

    /// Enricher over a fresh temp database with no inter-record delay.
    pub fn test_enricher(
        client: Arc<dyn GenerationClient>,
        images: Arc<dyn ImageSearch>,
    ) -> (Enricher, Arc<SqliteStore>) {
        let store = Arc::new(test_store());
        let config = EnrichConfig {
            batch_delay_ms: 0,
            ..EnrichConfig::default()
        };
        let enricher = Enricher::new(client, images, store.clone(), config);
        (enricher, store)
    }
}
