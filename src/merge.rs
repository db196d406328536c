//! Non-destructive merge of generated content into a record.
//!
//! Field rule: a generated value may only fill a field that is currently empty
//! (or whitespace). The display name is the single exception: it may always be
//! replaced, but only when the new value actually differs.
//!
//! Attribute rule: one attribute per (record, name). Known names are updated
//! in place or left alone, unknown names are created as `text`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::{AttributeKind, Record, RecordField, StoreError, UpdateSet};
use crate::store::RecordStore;
use crate::util::is_blank;

/// Field name (record column or attribute name) to generated value.
pub type CandidateMap = BTreeMap<String, String>;

/// Whether `candidate` may be written over `current` for `field`.
pub fn may_write_field(field: RecordField, current: Option<&str>, candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return false;
    }
    match field {
        RecordField::Name => current.map(str::trim) != Some(candidate),
        _ => is_blank(current),
    }
}

/// Decide which candidates become writes.
///
/// Keys that are not record columns, or not in `allowed`, are dropped.
pub fn plan_field_updates(
    record: &Record,
    candidates: &CandidateMap,
    allowed: &[RecordField],
) -> UpdateSet {
    let mut updates = UpdateSet::new();
    for (key, value) in candidates {
        let Some(field) = RecordField::from_column(key.trim()) else {
            log::debug!("Dropping candidate for unknown field '{}'", key);
            continue;
        };
        if !allowed.contains(&field) {
            continue;
        }
        if may_write_field(field, record.get(field), value) {
            updates.insert(field, value.trim().to_string());
        }
    }
    updates
}

/// How re-asserted attribute names are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeMergeMode {
    /// Create missing names, update changed values.
    Upsert,
    /// Create missing names only; existing names are never touched.
    AdditiveOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttributeStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl AttributeStats {
    pub fn changed(&self) -> usize {
        self.created + self.updated
    }
}

/// Reconcile attribute candidates against what the record already holds.
pub fn merge_attributes(
    store: &dyn RecordStore,
    record_id: i64,
    candidates: &BTreeMap<String, String>,
    mode: AttributeMergeMode,
) -> Result<AttributeStats, StoreError> {
    let mut existing: BTreeMap<String, (i64, Option<String>)> = store
        .list_attributes(record_id)?
        .into_iter()
        .map(|a| (a.name, (a.id, a.value)))
        .collect();

    let mut stats = AttributeStats::default();
    for (name, value) in candidates {
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            continue;
        }

        match existing.get(name) {
            Some(_) if mode == AttributeMergeMode::AdditiveOnly => stats.skipped += 1,
            Some((_, current)) if current.as_deref().map(str::trim) == Some(value) => {
                stats.unchanged += 1
            }
            Some((id, _)) => {
                store.update_attribute(*id, value)?;
                existing.insert(name.to_string(), (*id, Some(value.to_string())));
                stats.updated += 1;
            }
            None => {
                let created = store.create_attribute(record_id, name, AttributeKind::Text, value)?;
                existing.insert(name.to_string(), (created.id, created.value));
                stats.created += 1;
            }
        }
    }

    log::debug!(
        "Record {} attributes: {} created, {} updated, {} unchanged, {} skipped",
        record_id,
        stats.created,
        stats.updated,
        stats.unchanged,
        stats.skipped
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewRecord;
    use crate::store::test_utils::test_store;

    fn candidates(pairs: &[(&str, &str)]) -> CandidateMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_may_write_field_rules() {
        assert!(may_write_field(RecordField::Description, None, "x"));
        assert!(may_write_field(RecordField::Description, Some("  "), "x"));
        assert!(!may_write_field(RecordField::Description, Some("kept"), "x"));
        assert!(!may_write_field(RecordField::Description, None, "   "));

        assert!(may_write_field(RecordField::Name, Some("Old"), "New"));
        assert!(!may_write_field(RecordField::Name, Some("Same"), "Same"));
    }

    #[test]
    fn test_plan_keeps_filled_fields() {
        let record = Record {
            name: "Drill".into(),
            description: Some("Hand written".into()),
            ..Record::default()
        };
        let plan = plan_field_updates(
            &record,
            &candidates(&[
                ("description", "Generated"),
                ("seo_title", "Drill | Shop"),
                ("name", "Cordless Drill"),
                ("color", "red"),
                ("status", "active"),
            ]),
            &[
                RecordField::Name,
                RecordField::Description,
                RecordField::SeoTitle,
            ],
        );

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.get(&RecordField::SeoTitle).map(String::as_str), Some("Drill | Shop"));
        assert_eq!(plan.get(&RecordField::Name).map(String::as_str), Some("Cordless Drill"));
        assert!(!plan.contains_key(&RecordField::Description));
    }

    #[test]
    fn test_plan_with_all_fields_filled_is_empty() {
        let record = Record {
            name: "Drill".into(),
            description: Some("d".into()),
            seo_title: Some("t".into()),
            ..Record::default()
        };
        let plan = plan_field_updates(
            &record,
            &candidates(&[("name", "Drill"), ("description", "x"), ("seo_title", "y")]),
            &[RecordField::Name, RecordField::Description, RecordField::SeoTitle],
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_upsert_counts_without_duplicates() {
        let store = test_store();
        let record = store.insert_record(&NewRecord::new("SKU-1", "Drill")).unwrap();
        store
            .create_attribute(record.id, "Szín", AttributeKind::Text, "Kék")
            .unwrap();

        let stats = merge_attributes(
            &store,
            record.id,
            &candidates(&[("Szín", "Piros"), ("Méret", "L")]),
            AttributeMergeMode::Upsert,
        )
        .unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.created, 1);

        let attrs = store.list_attributes(record.id).unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].value.as_deref(), Some("Piros"));

        let again = merge_attributes(
            &store,
            record.id,
            &candidates(&[("Szín", "Piros"), ("Méret", "L")]),
            AttributeMergeMode::Upsert,
        )
        .unwrap();
        assert_eq!(again.changed(), 0);
        assert_eq!(again.unchanged, 2);
        assert_eq!(store.list_attributes(record.id).unwrap().len(), 2);
    }

    #[test]
    fn test_additive_mode_never_touches_existing() {
        let store = test_store();
        let record = store.insert_record(&NewRecord::new("SKU-1", "Drill")).unwrap();
        store
            .create_attribute(record.id, "Szín", AttributeKind::Text, "Kék")
            .unwrap();

        let stats = merge_attributes(
            &store,
            record.id,
            &candidates(&[("Szín", "Piros"), ("Márka", "Acme"), ("Üres", " ")]),
            AttributeMergeMode::AdditiveOnly,
        )
        .unwrap();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.updated, 0);

        let attrs = store.list_attributes(record.id).unwrap();
        assert_eq!(attrs[0].value.as_deref(), Some("Kék"));
        assert_eq!(attrs.len(), 2);
    }
}
