//! Repository error taxonomy shared by the account and task stores.

use crate::db::DbError;
use crate::model::account::{AccountId, AccountValidationError};
use crate::model::task::{TaskId, TaskValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite or handle failure.
    Db(DbError),
    /// Username is already registered.
    DuplicateUsername(String),
    /// Unknown username or wrong secret; deliberately indistinguishable.
    AuthFailed,
    /// Task owner does not reference an existing account.
    InvalidOwner(AccountId),
    /// Priority is outside the enumerated set.
    InvalidPriority(String),
    /// Due date failed to parse.
    InvalidDate(String),
    /// Task description is empty.
    EmptyDescription,
    /// Account record failed validation.
    InvalidAccount(AccountValidationError),
    /// Target task does not exist.
    NotFound(TaskId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateUsername(username) => {
                write!(f, "username already registered: `{username}`")
            }
            Self::AuthFailed => write!(f, "authentication failed"),
            Self::InvalidOwner(id) => write!(f, "task owner does not exist: {id}"),
            Self::InvalidPriority(value) => {
                write!(f, "invalid priority `{value}`; expected low|medium|high")
            }
            Self::InvalidDate(value) => write!(f, "invalid due date `{value}`; expected YYYY-MM-DD"),
            Self::EmptyDescription => write!(f, "task description must not be empty"),
            Self::InvalidAccount(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "repository requires table `{table}`"),
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidAccount(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        match value {
            TaskValidationError::EmptyDescription => Self::EmptyDescription,
            TaskValidationError::InvalidPriority(value) => Self::InvalidPriority(value),
            TaskValidationError::InvalidDate(value) => Self::InvalidDate(value),
        }
    }
}

impl From<AccountValidationError> for RepoError {
    fn from(value: AccountValidationError) -> Self {
        Self::InvalidAccount(value)
    }
}
