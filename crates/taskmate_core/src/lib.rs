//! Core domain logic for TaskMate, a single-user-per-session to-do manager.
//! This crate is the single source of truth for business invariants.

pub mod clock;
pub mod config;
pub mod credential;
pub mod db;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use credential::{
    Argon2CredentialVerifier, CredentialError, CredentialParams, CredentialVerifier,
};
pub use db::{Database, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::account::{Account, AccountId, AccountValidationError};
pub use model::task::{
    classify, is_overdue, parse_due_date, Priority, Task, TaskClass, TaskId, TaskValidationError,
};
pub use monitor::{
    ChannelSink, DueDateParseError, LogSink, MonitorHandle, MonitorState, OverdueMonitor,
    OverdueNotice, OverdueSink, SweepReport,
};
pub use repo::account_repo::{AccountRepository, SqliteAccountRepository};
pub use repo::error::{RepoError, RepoResult};
pub use repo::task_repo::{
    DueDateRecord, DueDateSnapshot, SnapshotRowError, SqliteTaskRepository, TaskRepository,
};
pub use service::task_service::{
    TaskFilter, TaskListQuery, TaskOrder, TaskService, TaskServiceError, TaskServiceResult,
    TaskView,
};

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
