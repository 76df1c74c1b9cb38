//! Account Store contract and SQLite implementation.
//!
//! # Invariants
//! - Usernames are unique and compared case-sensitively (SQLite `BINARY`).
//! - Accounts are never updated or deleted by this store.
//! - Authentication failures never reveal whether the username exists.

use crate::credential::CredentialVerifier;
use crate::model::account::{Account, AccountId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::support::{
    constraint_violation, ensure_connection_ready, parse_uuid, RequiredTable, UNIQUE_VIOLATION,
};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ACCOUNT_SELECT_SQL: &str = "SELECT
    uuid,
    username,
    credential,
    created_at
FROM accounts";

const REQUIRED_TABLES: &[RequiredTable] = &[(
    "accounts",
    &["uuid", "username", "credential", "created_at"],
)];

/// Repository interface for account records.
pub trait AccountRepository {
    /// Persists a new account.
    ///
    /// Fails with `DuplicateUsername` when the username is taken.
    fn create_account(&self, account: &Account) -> RepoResult<AccountId>;
    /// Loads one account by id.
    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>>;
    /// Loads one account by exact username.
    fn find_by_username(&self, username: &str) -> RepoResult<Option<Account>>;
    /// Returns whether an account with `id` exists.
    fn account_exists(&self, id: AccountId) -> RepoResult<bool>;

    /// Checks `secret` against the stored verifier for `username`.
    ///
    /// Returns `AuthFailed` for an unknown username and for a wrong secret.
    /// The check runs on the caller's connection borrow; callers sharing a
    /// locked connection should load with `find_by_username` and verify after
    /// releasing it.
    fn verify_credential(
        &self,
        username: &str,
        secret: &str,
        verifier: &dyn CredentialVerifier,
    ) -> RepoResult<AccountId> {
        match self.find_by_username(username)? {
            Some(account) if verifier.verify(secret, &account.credential) => Ok(account.id),
            _ => Err(RepoError::AuthFailed),
        }
    }
}

/// SQLite-backed account repository.
pub struct SqliteAccountRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    /// Wraps a connection already known to be migrated.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates repository from a connection after checking its schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create_account(&self, account: &Account) -> RepoResult<AccountId> {
        account.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO accounts (uuid, username, credential, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                account.id.to_string(),
                account.username.as_str(),
                account.credential.as_str(),
                account.created_at,
            ],
        );

        match inserted {
            Ok(_) => {
                info!(
                    "event=account_create module=repo status=ok account_id={}",
                    account.id
                );
                Ok(account.id)
            }
            Err(err) if constraint_violation(&err) == Some(UNIQUE_VIOLATION) => {
                debug!("event=account_create module=repo status=error error_code=duplicate_username");
                Err(RepoError::DuplicateUsername(account.username.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>> {
        self.conn
            .query_row(
                &format!("{ACCOUNT_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                read_account_columns,
            )
            .optional()?
            .map(AccountColumns::into_account)
            .transpose()
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<Account>> {
        self.conn
            .query_row(
                &format!("{ACCOUNT_SELECT_SQL} WHERE username = ?1;"),
                [username],
                read_account_columns,
            )
            .optional()?
            .map(AccountColumns::into_account)
            .transpose()
    }

    fn account_exists(&self, id: AccountId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

struct AccountColumns {
    uuid: String,
    username: String,
    credential: String,
    created_at: i64,
}

impl AccountColumns {
    fn into_account(self) -> RepoResult<Account> {
        Ok(Account {
            id: parse_uuid(&self.uuid, "accounts.uuid")?,
            username: self.username,
            credential: self.credential,
            created_at: self.created_at,
        })
    }
}

fn read_account_columns(row: &Row<'_>) -> rusqlite::Result<AccountColumns> {
    Ok(AccountColumns {
        uuid: row.get("uuid")?,
        username: row.get("username")?,
        credential: row.get("credential")?,
        created_at: row.get("created_at")?,
    })
}
