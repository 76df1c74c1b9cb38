//! Task Store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist task records bound to one owning account.
//! - Serve per-owner snapshots in insertion order.
//! - Hand the overdue monitor a raw due-date snapshot across all owners.
//!
//! # Invariants
//! - Inserts require the owner account to exist.
//! - `completed` only moves from 0 to 1; repeating the transition is a no-op.
//! - Deletion is a hard, irreversible removal.
//! - Insertion order is SQLite `rowid` order.

use crate::model::account::AccountId;
use crate::model::task::{format_due_date, parse_due_date, Priority, Task, TaskId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::support::{
    constraint_violation, ensure_connection_ready, parse_flag, parse_uuid, RequiredTable,
    FOREIGN_KEY_VIOLATION,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    owner_uuid,
    description,
    due_date,
    priority,
    completed,
    created_at
FROM tasks";

const REQUIRED_TABLES: &[RequiredTable] = &[
    ("accounts", &["uuid"]),
    (
        "tasks",
        &[
            "uuid",
            "owner_uuid",
            "description",
            "due_date",
            "priority",
            "completed",
            "created_at",
        ],
    ),
];

/// Raw due-date row read by the overdue monitor.
///
/// `due_date` is left unparsed so one malformed row cannot fail the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDateRecord {
    pub task_id: TaskId,
    pub owner: AccountId,
    pub description: String,
    pub due_date: String,
    pub completed: bool,
}

/// Snapshot row whose id, owner, text or flag columns could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRowError {
    pub rowid: i64,
    pub message: String,
}

/// Raw due-date rows plus the rows that failed to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueDateSnapshot {
    pub records: Vec<DueDateRecord>,
    pub row_errors: Vec<SnapshotRowError>,
}

/// Repository interface for task records.
pub trait TaskRepository {
    /// Persists a new task.
    ///
    /// Fails with `InvalidOwner` when the owner account does not exist.
    fn insert_task(&self, task: &Task) -> RepoResult<TaskId>;
    /// Loads one task by id.
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Lists one owner's tasks in insertion order.
    fn list_by_owner(&self, owner: AccountId) -> RepoResult<Vec<Task>>;
    /// Marks a task completed. Idempotent.
    fn set_completed(&self, id: TaskId) -> RepoResult<()>;
    /// Removes a task permanently.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Reads every task's due-date fields across all owners.
    ///
    /// Undecodable rows are reported in `row_errors`; only a failing query
    /// fails the whole snapshot.
    fn due_date_snapshot(&self) -> RepoResult<DueDateSnapshot>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Wraps a connection already known to be migrated.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates repository from a connection after checking its schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    fn owner_exists(&self, owner: AccountId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE uuid = ?1);",
            [owner.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        if !self.owner_exists(task.owner)? {
            return Err(RepoError::InvalidOwner(task.owner));
        }

        let inserted = self.conn.execute(
            "INSERT INTO tasks (
                uuid,
                owner_uuid,
                description,
                due_date,
                priority,
                completed,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                task.id.to_string(),
                task.owner.to_string(),
                task.description.as_str(),
                format_due_date(task.due_date),
                task.priority.as_str(),
                task.completed,
                task.created_at,
            ],
        );

        match inserted {
            Ok(_) => {
                info!(
                    "event=task_insert module=repo status=ok task_id={} owner_id={}",
                    task.id, task.owner
                );
                Ok(task.id)
            }
            Err(err) if constraint_violation(&err) == Some(FOREIGN_KEY_VIOLATION) => {
                Err(RepoError::InvalidOwner(task.owner))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.conn
            .query_row(
                &format!("{TASK_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                read_task_columns,
            )
            .optional()?
            .map(TaskColumns::into_task)
            .transpose()
    }

    fn list_by_owner(&self, owner: AccountId) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE owner_uuid = ?1
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(read_task_columns(row)?.into_task()?);
        }
        Ok(tasks)
    }

    fn set_completed(&self, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = 1 WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        info!("event=task_complete module=repo status=ok task_id={id}");
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        info!("event=task_delete module=repo status=ok task_id={id}");
        Ok(())
    }

    fn due_date_snapshot(&self) -> RepoResult<DueDateSnapshot> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid AS row_id, uuid, owner_uuid, description, due_date, completed
             FROM tasks
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut snapshot = DueDateSnapshot::default();
        while let Some(row) = rows.next()? {
            let rowid: i64 = row.get("row_id")?;
            match read_due_date_record(row) {
                Ok(record) => snapshot.records.push(record),
                Err(err) => snapshot.row_errors.push(SnapshotRowError {
                    rowid,
                    message: err.to_string(),
                }),
            }
        }
        Ok(snapshot)
    }
}

struct TaskColumns {
    uuid: String,
    owner_uuid: String,
    description: String,
    due_date: String,
    priority: String,
    completed: i64,
    created_at: i64,
}

impl TaskColumns {
    fn into_task(self) -> RepoResult<Task> {
        let due_date = parse_due_date(&self.due_date).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid due date `{}` in tasks.due_date",
                self.due_date
            ))
        })?;
        let priority = Priority::parse(&self.priority).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid priority `{}` in tasks.priority",
                self.priority
            ))
        })?;

        Ok(Task {
            id: parse_uuid(&self.uuid, "tasks.uuid")?,
            owner: parse_uuid(&self.owner_uuid, "tasks.owner_uuid")?,
            description: self.description,
            due_date,
            priority,
            completed: parse_flag(self.completed, "tasks.completed")?,
            created_at: self.created_at,
        })
    }
}

fn read_due_date_record(row: &Row<'_>) -> RepoResult<DueDateRecord> {
    let uuid: String = row.get("uuid")?;
    let owner: String = row.get("owner_uuid")?;
    Ok(DueDateRecord {
        task_id: parse_uuid(&uuid, "tasks.uuid")?,
        owner: parse_uuid(&owner, "tasks.owner_uuid")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        completed: parse_flag(row.get("completed")?, "tasks.completed")?,
    })
}

fn read_task_columns(row: &Row<'_>) -> rusqlite::Result<TaskColumns> {
    Ok(TaskColumns {
        uuid: row.get("uuid")?,
        owner_uuid: row.get("owner_uuid")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        priority: row.get("priority")?,
        completed: row.get("completed")?,
        created_at: row.get("created_at")?,
    })
}
