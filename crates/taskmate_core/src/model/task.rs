//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its priority tiers.
//! - Parse raw form input (description, due date, priority) into typed fields.
//! - Classify tasks for display as a pure function of stored fields and today.
//!
//! # Invariants
//! - `owner` is set at creation and never changes.
//! - `completed` only moves from `false` to `true`.
//! - `due_date` is a calendar date in canonical `YYYY-MM-DD` form.

use crate::model::account::AccountId;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of a task.
pub type TaskId = Uuid;

/// `chrono` format of the canonical due date representation.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

// chrono alone accepts `2025-3-1`; the canonical form is zero padded.
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid iso date regex"));

/// Field-level validation failures for task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Description is empty after trimming.
    EmptyDescription,
    /// Priority is outside `low|medium|high`.
    InvalidPriority(String),
    /// Due date is not a real `YYYY-MM-DD` calendar date.
    InvalidDate(String),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "task description must not be empty"),
            Self::InvalidPriority(value) => {
                write!(f, "invalid priority `{value}`; expected low|medium|high")
            }
            Self::InvalidDate(value) => {
                write!(f, "invalid due date `{value}`; expected YYYY-MM-DD")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// Priority tier of a task.
///
/// Ordering follows urgency: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Stable lowercase form used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses user input, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, TaskValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TaskValidationError::InvalidPriority(value.to_string())),
        }
    }
}

impl FromStr for Priority {
    type Err = TaskValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a canonical `YYYY-MM-DD` due date.
///
/// Rejects other layouts such as `DD-MM-YYYY` and impossible dates such as
/// `2025-02-30`.
pub fn parse_due_date(value: &str) -> Result<NaiveDate, TaskValidationError> {
    let trimmed = value.trim();
    if !ISO_DATE_RE.is_match(trimmed) {
        return Err(TaskValidationError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DUE_DATE_FORMAT)
        .map_err(|_| TaskValidationError::InvalidDate(value.to_string()))
}

/// Formats a due date in canonical storage form.
pub fn format_due_date(date: NaiveDate) -> String {
    date.format(DUE_DATE_FORMAT).to_string()
}

/// Display classification derived at read time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    Completed,
    Overdue,
    Priority(Priority),
}

/// Returns whether a task is overdue on `today`.
pub fn is_overdue(due_date: NaiveDate, completed: bool, today: NaiveDate) -> bool {
    due_date < today && !completed
}

/// Classifies a task for display.
///
/// Precedence: completed, then overdue, then priority tier.
pub fn classify(
    due_date: NaiveDate,
    completed: bool,
    priority: Priority,
    today: NaiveDate,
) -> TaskClass {
    if completed {
        TaskClass::Completed
    } else if is_overdue(due_date, completed, today) {
        TaskClass::Overdue
    } else {
        TaskClass::Priority(priority)
    }
}

/// To-do item owned by exactly one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: AccountId,
    pub description: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Task {
    /// Creates a pending task with a generated id.
    pub fn new(
        owner: AccountId,
        description: impl Into<String>,
        due_date: NaiveDate,
        priority: Priority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            description: description.into(),
            due_date,
            priority,
            completed: false,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Builds a pending task from raw form input.
    ///
    /// Fields are checked in form order: description, priority, due date. The
    /// first failing field is reported.
    pub fn parse(
        owner: AccountId,
        description: &str,
        due_date: &str,
        priority: &str,
    ) -> Result<Self, TaskValidationError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TaskValidationError::EmptyDescription);
        }
        let priority = Priority::parse(priority)?;
        let due_date = parse_due_date(due_date)?;
        Ok(Self::new(owner, description, due_date, priority))
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.description.trim().is_empty() {
            return Err(TaskValidationError::EmptyDescription);
        }
        Ok(())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(self.due_date, self.completed, today)
    }

    pub fn classify(&self, today: NaiveDate) -> TaskClass {
        classify(self.due_date, self.completed, self.priority, today)
    }
}
