//! SQLite storage bootstrap, schema migrations and the shared database handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the task manager core.
//! - Apply schema migrations in deterministic order.
//! - Provide one serialization point for the foreground flow and the
//!   overdue monitor.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Every access through [`Database`] holds the connection lock for the whole
//!   closure, so single-record operations are atomic across threads.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod handle;
pub mod migrations;
mod open;

pub use handle::Database;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A thread panicked while holding the connection lock.
    LockPoisoned,
    /// `close` was called while other clones of the handle were alive.
    StillShared { handles: usize },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::LockPoisoned => write!(f, "database connection lock is poisoned"),
            Self::StillShared { handles } => write!(
                f,
                "database handle is still shared by {handles} owners; refusing to close"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::LockPoisoned => None,
            Self::StillShared { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
