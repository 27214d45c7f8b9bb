//! Credential store
//!
//! A single SQLite table of `(username, password)` pairs. The username is the
//! primary key; registering an existing name fails and leaves the stored
//! record untouched.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password TEXT
)";

/// Credential store errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Username cannot be empty")]
    EmptyUsername,
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// SQLite-backed username/password table
pub struct CredentialStore {
    conn: Mutex<Connection>,
}

impl CredentialStore {
    /// Open (or create) the credential database at the given path
    pub fn open(path: &Path) -> Result<Self, AuthError> {
        let created = !path.exists();
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        if created {
            log::info!("Created credential database at {:?}", path);
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store with the same schema
    pub fn open_in_memory() -> Result<Self, AuthError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Register a new user
    pub fn create_user(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.is_empty() {
            return Err(AuthError::EmptyUsername);
        }

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2)",
            params![username, password],
        );

        match result {
            Ok(_) => {
                log::info!("Registered user '{}'", username);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(AuthError::UsernameTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check a username/password pair
    pub fn validate_user(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM users WHERE username = ?1 AND password = ?2",
                params![username, password],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Number of registered users
    pub fn user_count(&self) -> Result<u64, AuthError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_validate() {
        let store = CredentialStore::open_in_memory().unwrap();
        store.create_user("ada", "lovelace").unwrap();

        assert!(store.validate_user("ada", "lovelace").unwrap());
        assert!(!store.validate_user("ada", "babbage").unwrap());
        assert!(!store.validate_user("grace", "lovelace").unwrap());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = CredentialStore::open_in_memory().unwrap();
        store.create_user("ada", "first").unwrap();

        let err = store.create_user("ada", "second").unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));

        // Original password still valid, new one never stored
        assert!(store.validate_user("ada", "first").unwrap());
        assert!(!store.validate_user("ada", "second").unwrap());
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn test_empty_username_rejected() {
        let store = CredentialStore::open_in_memory().unwrap();
        assert!(matches!(
            store.create_user("", "secret"),
            Err(AuthError::EmptyUsername)
        ));
        assert_eq!(store.user_count().unwrap(), 0);
    }

    #[test]
    fn test_usernames_are_case_sensitive() {
        let store = CredentialStore::open_in_memory().unwrap();
        store.create_user("Ada", "pw").unwrap();
        store.create_user("ada", "pw").unwrap();
        assert_eq!(store.user_count().unwrap(), 2);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");

        {
            let store = CredentialStore::open(&path).unwrap();
            store.create_user("ada", "lovelace").unwrap();
        }

        let store = CredentialStore::open(&path).unwrap();
        assert!(store.validate_user("ada", "lovelace").unwrap());
        assert!(matches!(
            store.create_user("ada", "other"),
            Err(AuthError::UsernameTaken)
        ));
    }
}
