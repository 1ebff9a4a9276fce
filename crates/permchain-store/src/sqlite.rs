//! SQLite implementation of the StateDb trait.
//!
//! Uses rusqlite with bundled SQLite. The connection sits behind a mutex so
//! the accessor can be shared across threads.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use permchain_core::Address;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::StateDb;

/// SQLite-backed state.
#[derive(Clone)]
pub struct SqliteState {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteState {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("connection mutex: {}", e)))?;
        f(&conn)
    }
}

impl StateDb for SqliteState {
    fn get(&self, account: &Address, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM state WHERE account = ?1 AND key = ?2",
                    params![account.as_bytes().as_slice(), key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn set(&self, account: &Address, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO state (account, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(account, key) DO UPDATE SET value = excluded.value",
                params![account.as_bytes().as_slice(), key, value],
            )?;
            Ok(())
        })
    }

    fn delete(&self, account: &Address, key: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM state WHERE account = ?1 AND key = ?2",
                params![account.as_bytes().as_slice(), key],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn account(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn test_set_get_delete() {
        let state = SqliteState::open_memory().unwrap();
        assert_eq!(state.get(&account(1), b"k").unwrap(), None);

        state.set(&account(1), b"k", b"v1").unwrap();
        state.set(&account(1), b"k", b"v2").unwrap();
        assert_eq!(state.get(&account(1), b"k").unwrap(), Some(b"v2".to_vec()));

        state.delete(&account(1), b"k").unwrap();
        assert_eq!(state.get(&account(1), b"k").unwrap(), None);
    }

    #[test]
    fn test_accounts_are_partitioned() {
        let state = SqliteState::open_memory().unwrap();
        state.set(&account(1), b"k", b"one").unwrap();
        state.set(&account(2), b"k", b"two").unwrap();
        assert_eq!(state.get(&account(2), b"k").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");

        {
            let state = SqliteState::open(&path).unwrap();
            state.set(&account(7), b"cim/initialized", b"\x00").unwrap();
        }

        let state = SqliteState::open(&path).unwrap();
        assert!(state.contains(&account(7), b"cim/initialized").unwrap());
    }
}
