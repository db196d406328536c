//! Schema migration framework.
//!
//! Numbered SQL migrations are embedded at compile time via `include_str!`.
//! Each migration runs exactly once, tracked by the `schema_version` table.

use rusqlite::Connection;

struct Migration {
    version: i32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/001_baseline.sql"),
}];

/// Create the `schema_version` table if it doesn't exist.
fn ensure_schema_version_table(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("Failed to create schema_version table: {}", e))
}

/// Return the highest applied migration version, or 0 if none.
fn current_version(conn: &Connection) -> Result<i32, String> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| format!("Failed to read schema version: {}", e))
}

/// Run all pending migrations.
///
/// Returns the number of migrations applied (0 if already up-to-date). Fails
/// when the database carries a newer schema than this build knows about.
pub fn run_migrations(conn: &Connection) -> Result<usize, String> {
    ensure_schema_version_table(conn)?;

    let current = current_version(conn)?;
    let max_known = MIGRATIONS.last().map(|m| m.version).unwrap_or(0);

    if current > max_known {
        return Err(format!(
            "Database schema version ({}) is newer than this build supports ({}). \
             Please update catalog-enrich.",
            current, max_known
        ));
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        return Ok(0);
    }

    for migration in &pending {
        conn.execute_batch(migration.sql)
            .map_err(|e| format!("Migration v{} failed: {}", migration.version, e))?;

        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )
        .map_err(|e| format!("Failed to record migration v{}: {}", migration.version, e))?;

        log::info!("Applied migration v{}", migration.version);
    }

    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_db() -> Connection {
        Connection::open_in_memory().expect("in-memory db")
    }

    #[test]
    fn test_fresh_db_applies_baseline() {
        let conn = mem_db();
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, 1);
        assert_eq!(current_version(&conn).unwrap(), 1);

        conn.execute(
            "INSERT INTO records (external_id, name, created_at, updated_at)
             VALUES ('SKU-1', 'Test', '2025-01-01', '2025-01-01')",
            [],
        )
        .expect("records table should exist");

        conn.execute(
            "INSERT INTO attributes (record_id, name, value, created_at, updated_at)
             VALUES (1, 'Gyártó', 'Acme', '2025-01-01', '2025-01-01')",
            [],
        )
        .expect("attributes table should exist");

        let kind: String = conn
            .query_row("SELECT kind FROM attributes WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(kind, "text");
    }

    #[test]
    fn test_attribute_name_unique_per_record() {
        let conn = mem_db();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO records (external_id, name, created_at, updated_at)
             VALUES ('SKU-1', 'Test', 'now', 'now');
             INSERT INTO attributes (record_id, name, value, created_at, updated_at)
             VALUES (1, 'Szín', 'Piros', 'now', 'now');",
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO attributes (record_id, name, value, created_at, updated_at)
             VALUES (1, 'Szín', 'Kék', 'now', 'now')",
            [],
        );
        assert!(dup.is_err(), "duplicate (record, name) must be rejected");
    }

    #[test]
    fn test_forward_compat_guard() {
        let conn = mem_db();
        ensure_schema_version_table(&conn).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (999)", [])
            .unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert!(err.contains("newer than this build"), "unexpected error: {}", err);
    }

    #[test]
    fn test_idempotency() {
        let conn = mem_db();
        assert_eq!(run_migrations(&conn).unwrap(), 1);
        assert_eq!(run_migrations(&conn).unwrap(), 0);
        assert_eq!(current_version(&conn).unwrap(), 1);
    }
}
