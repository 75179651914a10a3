//! Schema versioning.
//!
//! The schema version lives in SQLite's `user_version` pragma. Each entry in
//! [`SCHEMA`] upgrades the database by one version inside a transaction.

use rusqlite::Connection;

use super::error::DatabaseError;

/// Upgrade scripts; entry `n` brings the database to version `n + 1`.
const SCHEMA: &[&str] = &[include_str!("sql/001_create_records.sql")];

fn user_version(conn: &Connection) -> Result<usize, DatabaseError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(usize::try_from(version).unwrap_or(0))
}

/// Applies every script newer than the database's current version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    let current = user_version(conn)?;
    if current > SCHEMA.len() {
        return Err(DatabaseError::Migration {
            version: current as u32,
            reason: format!(
                "database schema is newer than this build (max {})",
                SCHEMA.len()
            ),
        });
    }

    for (index, sql) in SCHEMA.iter().enumerate().skip(current) {
        let version = index + 1;
        log::info!("Upgrading records schema to v{}", version);

        let script = format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            sql, version
        );
        if let Err(e) = conn.execute_batch(&script) {
            let _ = conn.execute_batch("ROLLBACK;");
            return Err(DatabaseError::Migration {
                version: version as u32,
                reason: e.to_string(),
            });
        }
    }

    Ok(())
}
