//! Shared, lock-guarded database handle.
//!
//! The foreground service and the overdue monitor thread each hold a clone of
//! [`Database`]. Every call to [`Database::with_conn`] owns the connection for
//! the duration of the closure and releases it on return.

use super::{open_db, open_db_in_memory, DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle over one migrated SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("handles", &Arc::strong_count(&self.conn))
            .finish()
    }
}

impl Database {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// # Errors
    /// - Returns `DbError::LockPoisoned` (converted into `E`) when another
    ///   thread panicked while holding the lock.
    pub fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let guard = self.lock()?;
        f(&guard)
    }

    /// Closes the underlying connection.
    ///
    /// Only the last live handle can close; earlier callers get
    /// `DbError::StillShared` and the connection stays open for the others.
    pub fn close(self) -> DbResult<()> {
        let conn = match Arc::try_unwrap(self.conn) {
            Ok(mutex) => mutex.into_inner().map_err(|_| DbError::LockPoisoned)?,
            Err(shared) => {
                let handles = Arc::strong_count(&shared);
                warn!("event=db_close module=db status=error handles={handles}");
                return Err(DbError::StillShared { handles });
            }
        };

        conn.close().map_err(|(_, err)| DbError::Sqlite(err))?;
        info!("event=db_close module=db status=ok");
        Ok(())
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::db::DbError;

    #[test]
    fn with_conn_reads_migrated_schema() {
        let db = Database::open_in_memory().unwrap();
        let version: u32 = db
            .with_conn(|conn| {
                conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }

    #[test]
    fn close_is_refused_while_other_handles_exist() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();

        let err = db.close().unwrap_err();
        assert!(matches!(err, DbError::StillShared { handles: 2 }));

        other.close().unwrap();
    }
}
