//! In-memory implementation of the StateDb trait.
//!
//! Same semantics as SQLite, no persistence. Used by tests and by
//! transaction pools that verify against a scratch copy of state.

use std::collections::HashMap;
use std::sync::RwLock;

use permchain_core::Address;

use crate::error::{Result, StoreError};
use crate::traits::StateDb;

type Rows = HashMap<(Address, Vec<u8>), Vec<u8>>;

/// In-memory state.
///
/// All data is lost when the state is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryState {
    rows: RwLock<Rows>,
}

impl MemoryState {
    /// Create a new empty in-memory state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current contents into an independent state.
    pub fn snapshot(&self) -> Result<Self> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(Self {
            rows: RwLock::new(rows.clone()),
        })
    }

    /// Number of stored rows.
    pub fn len(&self) -> Result<usize> {
        Ok(self.rows.read().map_err(poisoned)?.len())
    }

    /// Whether the state holds no rows.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl StateDb for MemoryState {
    fn get(&self, account: &Address, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.get(&(*account, key.to_vec())).cloned())
    }

    fn set(&self, account: &Address, key: &[u8], value: &[u8]) -> Result<()> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.insert((*account, key.to_vec()), value.to_vec());
        Ok(())
    }

    fn delete(&self, account: &Address, key: &[u8]) -> Result<()> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.remove(&(*account, key.to_vec()));
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StateDbExt;

    fn account(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn test_set_get_delete() {
        let state = MemoryState::new();
        assert_eq!(state.get(&account(1), b"k").unwrap(), None);

        state.set(&account(1), b"k", b"v1").unwrap();
        state.set(&account(1), b"k", b"v2").unwrap();
        assert_eq!(state.get(&account(1), b"k").unwrap(), Some(b"v2".to_vec()));
        assert!(state.contains(&account(1), b"k").unwrap());

        state.delete(&account(1), b"k").unwrap();
        assert!(!state.contains(&account(1), b"k").unwrap());
        state.delete(&account(1), b"k").unwrap();
    }

    #[test]
    fn test_accounts_are_partitioned() {
        let state = MemoryState::new();
        state.set(&account(1), b"k", b"one").unwrap();
        state.set(&account(2), b"k", b"two").unwrap();
        assert_eq!(state.get(&account(1), b"k").unwrap(), Some(b"one".to_vec()));
        assert_eq!(state.get(&account(2), b"k").unwrap(), Some(b"two".to_vec()));
        assert_eq!(state.len().unwrap(), 2);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let state = MemoryState::new();
        state.set(&account(1), b"k", b"before").unwrap();
        let snap = state.snapshot().unwrap();
        state.set(&account(1), b"k", b"after").unwrap();
        assert_eq!(snap.get(&account(1), b"k").unwrap(), Some(b"before".to_vec()));
    }

    #[test]
    fn test_cbor_helpers() {
        let state = MemoryState::new();
        let value: Vec<(String, u64)> = vec![("a".into(), 1), ("b".into(), 2)];
        state.set_cbor(&account(3), b"list", &value).unwrap();
        let back: Option<Vec<(String, u64)>> = state.get_cbor(&account(3), b"list").unwrap();
        assert_eq!(back, Some(value));

        state.set(&account(3), b"junk", &[0xff, 0xff]).unwrap();
        let bad: Result<Option<Vec<u64>>> = state.get_cbor(&account(3), b"junk");
        assert!(matches!(bad, Err(StoreError::Serialization(_))));
    }
}
