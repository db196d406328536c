use chrono::Utc;
use rusqlite::{params, Row};

use super::*;

impl CatalogDb {
    // =========================================================================
    // Attributes
    // =========================================================================

    /// Attributes of a record, in insertion order.
    pub fn list_attributes(&self, record_id: i64) -> Result<Vec<Attribute>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, record_id, name, kind, value
             FROM attributes
             WHERE record_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![record_id], Self::map_attribute_row)?;
        let mut attributes = Vec::new();
        for row in rows {
            attributes.push(row?);
        }
        Ok(attributes)
    }

    pub fn create_attribute(
        &self,
        record_id: i64,
        name: &str,
        kind: AttributeKind,
        value: &str,
    ) -> Result<Attribute, StoreError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM records WHERE id = ?1)",
            params![record_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::MissingRecord(record_id));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO attributes (record_id, name, kind, value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![record_id, name, kind.as_str(), value, now],
        )?;

        Ok(Attribute {
            id: self.conn.last_insert_rowid(),
            record_id,
            name: name.to_string(),
            kind,
            value: Some(value.to_string()),
        })
    }

    /// Replace the value of an existing attribute.
    pub fn update_attribute(&self, attribute_id: i64, value: &str) -> Result<(), StoreError> {
        let rows = self.conn.execute(
            "UPDATE attributes SET value = ?1, updated_at = ?2 WHERE id = ?3",
            params![value, Utc::now().to_rfc3339(), attribute_id],
        )?;
        if rows == 0 {
            return Err(StoreError::MissingAttribute(attribute_id));
        }
        Ok(())
    }

    fn map_attribute_row(row: &Row<'_>) -> rusqlite::Result<Attribute> {
        let kind: String = row.get(3)?;
        Ok(Attribute {
            id: row.get(0)?,
            record_id: row.get(1)?,
            name: row.get(2)?,
            kind: kind.parse().unwrap_or_default(),
            value: row.get(4)?,
        })
    }
}
