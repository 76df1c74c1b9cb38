use taskmate_core::db::open_db_in_memory;
use taskmate_core::{
    Account, AccountRepository, Argon2CredentialVerifier, CredentialParams, CredentialVerifier,
    RepoError, SqliteAccountRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn cheap_verifier() -> Argon2CredentialVerifier {
    Argon2CredentialVerifier::new(CredentialParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

#[test]
fn create_and_load_account_by_id_and_username() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::try_new(&conn).unwrap();
    let account = Account::new("alice", "stored-hash");

    let id = repo.create_account(&account).unwrap();
    assert_eq!(id, account.id);
    assert!(repo.account_exists(id).unwrap());

    let by_id = repo.get_account(id).unwrap().unwrap();
    assert_eq!(by_id.username, "alice");
    assert_eq!(by_id.credential, "stored-hash");

    let by_name = repo.find_by_username("alice").unwrap().unwrap();
    assert_eq!(by_name.id, id);
}

#[test]
fn unknown_account_lookups_return_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::new(&conn);

    assert!(repo.get_account(Uuid::new_v4()).unwrap().is_none());
    assert!(repo.find_by_username("nobody").unwrap().is_none());
    assert!(!repo.account_exists(Uuid::new_v4()).unwrap());
}

#[test]
fn duplicate_username_is_rejected_and_first_account_survives() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::new(&conn);
    let first = Account::new("alice", "hash-1");
    repo.create_account(&first).unwrap();

    let err = repo
        .create_account(&Account::new("alice", "hash-2"))
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateUsername(ref name) if name == "alice"));

    let stored = repo.find_by_username("alice").unwrap().unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.credential, "hash-1");
}

#[test]
fn blank_username_is_rejected_before_insert() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::new(&conn);

    let err = repo.create_account(&Account::new("   ", "hash")).unwrap_err();
    assert!(matches!(err, RepoError::InvalidAccount(_)));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM accounts;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn verify_credential_accepts_only_the_registered_secret() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::new(&conn);
    let verifier = cheap_verifier();
    let account = Account::new("alice", verifier.hash("secret1").unwrap());
    repo.create_account(&account).unwrap();

    let id = repo
        .verify_credential("alice", "secret1", &verifier)
        .unwrap();
    assert_eq!(id, account.id);

    let wrong_secret = repo
        .verify_credential("alice", "wrong", &verifier)
        .unwrap_err();
    let unknown_user = repo
        .verify_credential("mallory", "secret1", &verifier)
        .unwrap_err();
    assert!(matches!(wrong_secret, RepoError::AuthFailed));
    assert!(matches!(unknown_user, RepoError::AuthFailed));
    assert_eq!(wrong_secret.to_string(), unknown_user.to_string());
}

#[test]
fn stored_credential_is_not_the_plain_secret() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccountRepository::new(&conn);
    let verifier = cheap_verifier();
    repo.create_account(&Account::new("alice", verifier.hash("secret1").unwrap()))
        .unwrap();

    let stored: String = conn
        .query_row(
            "SELECT credential FROM accounts WHERE username = 'alice';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_ne!(stored, "secret1");
    assert!(!stored.contains("secret1"));
}

#[test]
fn try_new_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let result = SqliteAccountRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::UninitializedConnection { .. })
    ));
}
