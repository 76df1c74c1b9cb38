//! Task use-case service.
//!
//! # Responsibility
//! - Provide account and task entry points for the presentation shell.
//! - Validate raw form input before it reaches the stores.
//! - Enforce ownership on task mutations.
//! - Classify tasks for display at read time.
//!
//! # Invariants
//! - Store errors surface unchanged in meaning; this layer never formats UI text.
//! - A caller can only read, complete or remove tasks owned by the account it
//!   passes in. Foreign task ids look exactly like missing ones.
//! - Every store call runs under one acquisition of the shared [`Database`].
//! - Credential hashing and verification never run while that lock is held.

use crate::clock::Clock;
use crate::credential::{CredentialError, CredentialVerifier};
use crate::db::{DbError, Database};
use crate::model::account::{Account, AccountId, AccountValidationError};
use crate::model::task::{Task, TaskClass, TaskId, TaskValidationError};
use crate::repo::account_repo::{AccountRepository, SqliteAccountRepository};
use crate::repo::error::RepoError;
use crate::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Service error for account and task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    EmptyUsername,
    EmptySecret,
    DuplicateUsername(String),
    AuthFailed,
    EmptyDescription,
    InvalidPriority(String),
    InvalidDate(String),
    InvalidOwner(AccountId),
    /// Task is missing or owned by another account.
    TaskNotFound(TaskId),
    Credential(CredentialError),
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptySecret => write!(f, "secret must not be empty"),
            Self::DuplicateUsername(username) => {
                write!(f, "username already registered: `{username}`")
            }
            Self::AuthFailed => write!(f, "authentication failed"),
            Self::EmptyDescription => write!(f, "task description must not be empty"),
            Self::InvalidPriority(value) => {
                write!(f, "invalid priority `{value}`; expected low|medium|high")
            }
            Self::InvalidDate(value) => write!(f, "invalid due date `{value}`; expected YYYY-MM-DD"),
            Self::InvalidOwner(id) => write!(f, "task owner does not exist: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Credential(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateUsername(username) => Self::DuplicateUsername(username),
            RepoError::AuthFailed => Self::AuthFailed,
            RepoError::InvalidOwner(id) => Self::InvalidOwner(id),
            RepoError::InvalidPriority(value) => Self::InvalidPriority(value),
            RepoError::InvalidDate(value) => Self::InvalidDate(value),
            RepoError::EmptyDescription => Self::EmptyDescription,
            RepoError::InvalidAccount(AccountValidationError::EmptyUsername) => Self::EmptyUsername,
            RepoError::NotFound(id) => Self::TaskNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<DbError> for TaskServiceError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        RepoError::from(value).into()
    }
}

impl From<CredentialError> for TaskServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Sort order for task listings. Ties keep insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrder {
    #[default]
    Insertion,
    /// Earliest due date first.
    DueDate,
    /// Highest priority first.
    Priority,
}

/// Subset selection for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
    /// Pending tasks whose due date has passed.
    Overdue,
}

/// Listing options for [`TaskService::tasks_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskListQuery {
    pub order: TaskOrder,
    pub filter: TaskFilter,
}

/// Display-ready task with its read-time classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub task: Task,
    pub class: TaskClass,
}

/// Task service facade over the shared database and collaborators.
pub struct TaskService<V: CredentialVerifier> {
    db: Database,
    verifier: V,
    clock: Arc<dyn Clock>,
}

impl<V: CredentialVerifier> TaskService<V> {
    /// Creates a service over an opened database.
    pub fn new(db: Database, verifier: V, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            verifier,
            clock,
        }
    }

    /// Registers a new account.
    ///
    /// Surrounding whitespace of `username` is ignored; case is preserved.
    pub fn register(&self, username: &str, secret: &str) -> TaskServiceResult<AccountId> {
        let username = username.trim();
        if username.is_empty() {
            return Err(TaskServiceError::EmptyUsername);
        }
        if secret.is_empty() {
            return Err(TaskServiceError::EmptySecret);
        }

        let credential = self.verifier.hash(secret)?;
        let account = Account::new(username, credential);
        let account_id = self
            .db
            .with_conn(|conn| SqliteAccountRepository::new(conn).create_account(&account))?;

        info!("event=register module=service status=ok account_id={account_id}");
        Ok(account_id)
    }

    /// Authenticates a username/secret pair.
    ///
    /// Unknown usernames and wrong secrets both fail with `AuthFailed`.
    pub fn authenticate(&self, username: &str, secret: &str) -> TaskServiceResult<AccountId> {
        let username = username.trim();
        let account = self
            .db
            .with_conn(|conn| SqliteAccountRepository::new(conn).find_by_username(username))?;

        match account {
            Some(account) if self.verifier.verify(secret, &account.credential) => {
                info!(
                    "event=authenticate module=service status=ok account_id={}",
                    account.id
                );
                Ok(account.id)
            }
            _ => {
                info!("event=authenticate module=service status=error");
                Err(TaskServiceError::AuthFailed)
            }
        }
    }

    /// Adds a pending task for `owner` from raw form input.
    ///
    /// # Errors
    /// - Field errors (`EmptyDescription`, `InvalidPriority`, `InvalidDate`)
    ///   are raised before touching storage.
    /// - `InvalidOwner` when `owner` is not a registered account.
    pub fn add_task(
        &self,
        owner: AccountId,
        description: &str,
        due_date: &str,
        priority: &str,
    ) -> TaskServiceResult<Task> {
        let task = Task::parse(owner, description, due_date, priority)?;
        self.db
            .with_conn(|conn| SqliteTaskRepository::new(conn).insert_task(&task))?;
        debug!(
            "event=add_task module=service status=ok task_id={} owner_id={}",
            task.id, owner
        );
        Ok(task)
    }

    /// Lists an account's tasks with display classification.
    ///
    /// Returns a snapshot; later mutations are not reflected.
    pub fn tasks_for(
        &self,
        account: AccountId,
        query: &TaskListQuery,
    ) -> TaskServiceResult<Vec<TaskView>> {
        let tasks = self
            .db
            .with_conn(|conn| SqliteTaskRepository::new(conn).list_by_owner(account))?;
        let today = self.clock.today();

        let mut views: Vec<TaskView> = tasks
            .into_iter()
            .filter(|task| match query.filter {
                TaskFilter::All => true,
                TaskFilter::Pending => !task.completed,
                TaskFilter::Completed => task.completed,
                TaskFilter::Overdue => task.is_overdue(today),
            })
            .map(|task| TaskView {
                class: task.classify(today),
                task,
            })
            .collect();

        // `sort_by` is stable, so equal keys keep insertion order.
        match query.order {
            TaskOrder::Insertion => {}
            TaskOrder::DueDate => views.sort_by(|a, b| a.task.due_date.cmp(&b.task.due_date)),
            TaskOrder::Priority => views.sort_by(|a, b| b.task.priority.cmp(&a.task.priority)),
        }

        Ok(views)
    }

    /// Loads one owned task, e.g. for a detail view.
    pub fn task_for(&self, account: AccountId, task_id: TaskId) -> TaskServiceResult<TaskView> {
        let task = self.db.with_conn(|conn| {
            owned_task(&SqliteTaskRepository::new(conn), account, task_id)
        })?;
        let today = self.clock.today();
        Ok(TaskView {
            class: task.classify(today),
            task,
        })
    }

    /// Marks an owned task completed. Completing twice is not an error.
    pub fn complete_task(&self, account: AccountId, task_id: TaskId) -> TaskServiceResult<()> {
        self.db.with_conn(|conn| {
            let repo = SqliteTaskRepository::new(conn);
            owned_task(&repo, account, task_id)?;
            repo.set_completed(task_id).map_err(TaskServiceError::from)
        })
    }

    /// Permanently removes an owned task.
    pub fn remove_task(&self, account: AccountId, task_id: TaskId) -> TaskServiceResult<()> {
        self.db.with_conn(|conn| {
            let repo = SqliteTaskRepository::new(conn);
            owned_task(&repo, account, task_id)?;
            repo.delete_task(task_id).map_err(TaskServiceError::from)
        })
    }
}

fn owned_task(
    repo: &impl TaskRepository,
    account: AccountId,
    task_id: TaskId,
) -> TaskServiceResult<Task> {
    match repo.get_task(task_id)? {
        Some(task) if task.owner == account => Ok(task),
        Some(_) => {
            info!(
                "event=ownership_check module=service status=error task_id={task_id} account_id={account}"
            );
            Err(TaskServiceError::TaskNotFound(task_id))
        }
        None => Err(TaskServiceError::TaskNotFound(task_id)),
    }
}
