use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::*;
use crate::util::{slug_base, unique_slug, FALLBACK_SLUG};

const RECORD_COLUMNS: &str = "id, external_id, name, status, category, short_description,
    description, features, slug, link, unit, image_link, image_alt_title, image_filename,
    og_image, seo_title, seo_description, seo_keywords, seo_robots, net_price, gross_price,
    min_quantity, max_quantity, created_at, updated_at";

impl CatalogDb {
    // =========================================================================
    // Records
    // =========================================================================

    /// Insert a record. The slug is derived from the name unless one is given,
    /// and is made unique either way.
    pub fn insert_record(&self, record: &NewRecord) -> Result<Record, StoreError> {
        let now = Utc::now().to_rfc3339();
        let base = record
            .fields
            .get(&RecordField::Slug)
            .map(|s| slug_base(s))
            .unwrap_or_else(|| slug_base(&record.name));
        let slug = self.unique_slug_for(&base, None)?;

        let mut columns = vec!["external_id", "name", "slug", "net_price", "gross_price"];
        let mut values: Vec<rusqlite::types::Value> = vec![
            record.external_id.clone().into(),
            record.name.clone().into(),
            slug.into(),
            record.net_price.into(),
            record.gross_price.into(),
        ];
        for (field, value) in &record.fields {
            if matches!(field, RecordField::Name | RecordField::Slug) {
                continue;
            }
            columns.push(field.column());
            values.push(value.clone().into());
        }
        columns.push("created_at");
        values.push(now.clone().into());
        columns.push("updated_at");
        values.push(now.into());

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO records ({}) VALUES ({})",
            columns.join(", "),
            placeholders
        );
        self.conn.execute(&sql, params_from_iter(values))?;

        let id = self.conn.last_insert_rowid();
        self.get_record(id)?.ok_or(StoreError::MissingRecord(id))
    }

    /// Get a record by its numeric id.
    pub fn get_record(&self, id: i64) -> Result<Option<Record>, StoreError> {
        let sql = format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_record_row)
            .optional()?)
    }

    /// Get a record by its external identifier (SKU).
    pub fn get_record_by_external_id(&self, external_id: &str) -> Result<Option<Record>, StoreError> {
        let sql = format!("SELECT {} FROM records WHERE external_id = ?1", RECORD_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![external_id], Self::map_record_row)
            .optional()?)
    }

    /// All record ids in insertion order.
    pub fn list_record_ids(&self) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id FROM records ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Apply field writes to a record and return the stored result.
    ///
    /// When the set carries a name that differs from the stored one, the slug is
    /// regenerated from it; an explicit slug in the same set loses to the name.
    pub fn update_record(&self, id: i64, updates: &UpdateSet) -> Result<Record, StoreError> {
        let current = self.get_record(id)?.ok_or(StoreError::MissingRecord(id))?;
        if updates.is_empty() {
            return Ok(current);
        }

        let mut writes = updates.clone();
        if writes.get(&RecordField::Name) == Some(&current.name) {
            writes.remove(&RecordField::Name);
        }
        let slug_source = writes
            .get(&RecordField::Name)
            .or_else(|| writes.get(&RecordField::Slug))
            .map(|s| slug_base(s));
        if let Some(base) = slug_source {
            let slug = self.unique_slug_for(&base, Some(id))?;
            writes.insert(RecordField::Slug, slug);
        }
        if writes.is_empty() {
            return Ok(current);
        }

        let mut assignments = Vec::with_capacity(writes.len() + 1);
        let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(writes.len() + 2);
        for (i, (field, value)) in writes.iter().enumerate() {
            assignments.push(format!("{} = ?{}", field.column(), i + 1));
            values.push(value.clone().into());
        }
        assignments.push(format!("updated_at = ?{}", values.len() + 1));
        values.push(Utc::now().to_rfc3339().into());
        let sql = format!(
            "UPDATE records SET {} WHERE id = ?{}",
            assignments.join(", "),
            values.len() + 1
        );
        values.push(id.into());

        let rows = self.conn.execute(&sql, params_from_iter(values))?;
        if rows == 0 {
            return Err(StoreError::MissingRecord(id));
        }

        self.get_record(id)?.ok_or(StoreError::MissingRecord(id))
    }

    /// First free slug of `base`, `base-1`, `base-2`, ... among records other
    /// than `exclude_id`.
    pub fn unique_slug_for(&self, base: &str, exclude_id: Option<i64>) -> Result<String, StoreError> {
        let base = if base.is_empty() { FALLBACK_SLUG } else { base };
        let mut stmt = self.conn.prepare(
            "SELECT slug FROM records
             WHERE slug IS NOT NULL
               AND (slug = ?1 OR slug LIKE ?1 || '-%')
               AND id != ?2",
        )?;
        let rows = stmt.query_map(params![base, exclude_id.unwrap_or(-1)], |row| {
            row.get::<_, String>(0)
        })?;
        let mut taken = HashSet::new();
        for row in rows {
            taken.insert(row?);
        }
        Ok(unique_slug(base, |candidate| taken.contains(candidate)))
    }

    fn map_record_row(row: &Row<'_>) -> rusqlite::Result<Record> {
        Ok(Record {
            id: row.get(0)?,
            external_id: row.get(1)?,
            name: row.get(2)?,
            status: row.get(3)?,
            category: row.get(4)?,
            short_description: row.get(5)?,
            description: row.get(6)?,
            features: row.get(7)?,
            slug: row.get(8)?,
            link: row.get(9)?,
            unit: row.get(10)?,
            image_link: row.get(11)?,
            image_alt_title: row.get(12)?,
            image_filename: row.get(13)?,
            og_image: row.get(14)?,
            seo_title: row.get(15)?,
            seo_description: row.get(16)?,
            seo_keywords: row.get(17)?,
            seo_robots: row.get(18)?,
            net_price: row.get(19)?,
            gross_price: row.get(20)?,
            min_quantity: row.get(21)?,
            max_quantity: row.get(22)?,
            created_at: row.get(23)?,
            updated_at: row.get(24)?,
        })
    }
}
