//! SQL helpers shared by the SQLite repositories.

use crate::db::migrations::latest_version;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::{ffi, Connection};
use uuid::Uuid;

/// Table name plus the columns a repository reads or writes.
pub(crate) type RequiredTable = (&'static str, &'static [&'static str]);

/// Verifies a connection is migrated and carries the expected layout.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    required: &[RequiredTable],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Parses a persisted uuid column, reporting the column on failure.
pub(crate) fn parse_uuid(text: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}

/// Parses a persisted 0/1 flag.
pub(crate) fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

/// Returns the extended result code of a constraint violation, if `err` is one.
pub(crate) fn constraint_violation(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(inner.extended_code)
        }
        _ => None,
    }
}

pub(crate) const UNIQUE_VIOLATION: i32 = ffi::SQLITE_CONSTRAINT_UNIQUE;
pub(crate) const FOREIGN_KEY_VIOLATION: i32 = ffi::SQLITE_CONSTRAINT_FOREIGNKEY;
