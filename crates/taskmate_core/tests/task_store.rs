use chrono::NaiveDate;
use rusqlite::Connection;
use taskmate_core::db::migrations::latest_version;
use taskmate_core::db::open_db_in_memory;
use taskmate_core::{
    Account, AccountId, AccountRepository, Priority, RepoError, SqliteAccountRepository,
    SqliteTaskRepository, Task, TaskRepository,
};
use uuid::Uuid;

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn seed_account(conn: &Connection, username: &str) -> AccountId {
    SqliteAccountRepository::new(conn)
        .create_account(&Account::new(username, "hash"))
        .unwrap()
}

#[test]
fn insert_and_list_keep_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_account(&conn, "alice");
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let late = Task::new(owner, "file taxes", date("2025-04-15"), Priority::High);
    let early = Task::new(owner, "buy milk", date("2025-03-01"), Priority::Medium);
    repo.insert_task(&late).unwrap();
    repo.insert_task(&early).unwrap();

    let tasks = repo.list_by_owner(owner).unwrap();
    let ids: Vec<_> = tasks.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![late.id, early.id]);
    assert_eq!(tasks[1].description, "buy milk");
    assert_eq!(tasks[1].due_date, date("2025-03-01"));
    assert_eq!(tasks[1].priority, Priority::Medium);
    assert!(!tasks[1].completed);
}

#[test]
fn list_by_owner_only_returns_that_owners_tasks() {
    let conn = open_db_in_memory().unwrap();
    let alice = seed_account(&conn, "alice");
    let bob = seed_account(&conn, "bob");
    let repo = SqliteTaskRepository::new(&conn);

    repo.insert_task(&Task::new(alice, "a", date("2025-03-01"), Priority::Low))
        .unwrap();
    repo.insert_task(&Task::new(bob, "b", date("2025-03-01"), Priority::Low))
        .unwrap();

    let alice_tasks = repo.list_by_owner(alice).unwrap();
    assert_eq!(alice_tasks.len(), 1);
    assert!(alice_tasks.iter().all(|task| task.owner == alice));
    assert!(repo.list_by_owner(Uuid::new_v4()).unwrap().is_empty());
}

#[test]
fn insert_with_unknown_owner_fails_with_invalid_owner() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::new(&conn);
    let ghost = Uuid::new_v4();

    let err = repo
        .insert_task(&Task::new(ghost, "orphan", date("2025-03-01"), Priority::Low))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidOwner(id) if id == ghost));
}

#[test]
fn insert_rejects_blank_description() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_account(&conn, "alice");
    let repo = SqliteTaskRepository::new(&conn);

    let err = repo
        .insert_task(&Task::new(owner, "  ", date("2025-03-01"), Priority::Low))
        .unwrap_err();
    assert!(matches!(err, RepoError::EmptyDescription));
    assert!(repo.list_by_owner(owner).unwrap().is_empty());
}

#[test]
fn set_completed_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_account(&conn, "alice");
    let repo = SqliteTaskRepository::new(&conn);
    let task = Task::new(owner, "buy milk", date("2025-03-01"), Priority::Medium);
    repo.insert_task(&task).unwrap();

    repo.set_completed(task.id).unwrap();
    repo.set_completed(task.id).unwrap();

    let stored = repo.get_task(task.id).unwrap().unwrap();
    assert!(stored.completed);
}

#[test]
fn set_completed_on_missing_task_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::new(&conn);
    let missing = Uuid::new_v4();

    let err = repo.set_completed(missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn delete_removes_task_and_second_delete_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_account(&conn, "alice");
    let repo = SqliteTaskRepository::new(&conn);
    let task = Task::new(owner, "buy milk", date("2025-03-01"), Priority::Medium);
    repo.insert_task(&task).unwrap();

    repo.delete_task(task.id).unwrap();
    assert!(repo.get_task(task.id).unwrap().is_none());
    assert!(repo.list_by_owner(owner).unwrap().is_empty());

    let err = repo.delete_task(task.id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
    assert!(matches!(
        repo.set_completed(task.id),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn due_date_snapshot_spans_all_owners_with_raw_dates() {
    let conn = open_db_in_memory().unwrap();
    let alice = seed_account(&conn, "alice");
    let bob = seed_account(&conn, "bob");
    let repo = SqliteTaskRepository::new(&conn);
    let first = Task::new(alice, "a", date("2025-03-01"), Priority::Low);
    let second = Task::new(bob, "b", date("2025-12-31"), Priority::High);
    repo.insert_task(&first).unwrap();
    repo.insert_task(&second).unwrap();
    repo.set_completed(second.id).unwrap();

    let snapshot = repo.due_date_snapshot().unwrap();
    assert!(snapshot.row_errors.is_empty());
    let records = snapshot.records;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].task_id, first.id);
    assert_eq!(records[0].owner, alice);
    assert_eq!(records[0].due_date, "2025-03-01");
    assert!(!records[0].completed);
    assert_eq!(records[1].owner, bob);
    assert!(records[1].completed);
}

#[test]
fn malformed_persisted_due_date_surfaces_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_account(&conn, "alice");
    let task_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO tasks (uuid, owner_uuid, description, due_date, priority)
         VALUES (?1, ?2, 'legacy', '01-03-2025', 'low');",
        [task_id.to_string(), owner.to_string()],
    )
    .unwrap();
    let repo = SqliteTaskRepository::new(&conn);

    let err = repo.get_task(task_id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));

    let snapshot = repo.due_date_snapshot().unwrap();
    assert_eq!(snapshot.records[0].due_date, "01-03-2025");
}

#[test]
fn due_date_snapshot_isolates_undecodable_rows() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_account(&conn, "alice");
    conn.execute(
        "INSERT INTO tasks (uuid, owner_uuid, description, due_date, priority)
         VALUES ('not-a-uuid', ?1, 'legacy', '2025-03-01', 'low');",
        [owner.to_string()],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO tasks (uuid, owner_uuid, description, due_date, priority)
         VALUES (?1, ?2, CAST(X'FF' AS TEXT), '2025-03-01', 'low');",
        [Uuid::new_v4().to_string(), owner.to_string()],
    )
    .unwrap();
    let repo = SqliteTaskRepository::new(&conn);
    let good = Task::new(owner, "buy milk", date("2025-03-01"), Priority::Medium);
    repo.insert_task(&good).unwrap();

    let snapshot = repo.due_date_snapshot().unwrap();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].task_id, good.id);
    let rowids: Vec<i64> = snapshot.row_errors.iter().map(|row| row.rowid).collect();
    assert_eq!(rowids, vec![1, 2]);
    assert!(snapshot.row_errors[0].message.contains("not-a-uuid"));
}

#[test]
fn try_new_rejects_connection_without_migrations() {
    let conn = Connection::open_in_memory().unwrap();
    let result = SqliteTaskRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
}

#[test]
fn try_new_rejects_connection_missing_tasks_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE accounts (uuid TEXT PRIMARY KEY);
         PRAGMA user_version = {};",
        latest_version()
    ))
    .unwrap();

    let result = SqliteTaskRepository::try_new(&conn);
    assert!(matches!(result, Err(RepoError::MissingRequiredTable("tasks"))));
}
