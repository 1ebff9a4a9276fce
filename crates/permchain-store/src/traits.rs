//! The state accessor trait.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use permchain_core::Address;

use crate::error::{Result, StoreError};

/// Key/value state, partitioned by account.
///
/// Implementations use interior locking so a single accessor can be shared
/// between the transaction pool and block production.
pub trait StateDb: Send + Sync {
    /// Read the value stored under `(account, key)`.
    fn get(&self, account: &Address, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `(account, key)`, replacing any previous value.
    fn set(&self, account: &Address, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `(account, key)`. Removing a missing key is not an error.
    fn delete(&self, account: &Address, key: &[u8]) -> Result<()>;

    /// Whether `(account, key)` holds a value.
    fn contains(&self, account: &Address, key: &[u8]) -> Result<bool> {
        Ok(self.get(account, key)?.is_some())
    }
}

impl<S: StateDb + ?Sized> StateDb for Arc<S> {
    fn get(&self, account: &Address, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(account, key)
    }

    fn set(&self, account: &Address, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(account, key, value)
    }

    fn delete(&self, account: &Address, key: &[u8]) -> Result<()> {
        (**self).delete(account, key)
    }
}

/// CBOR convenience methods for any [`StateDb`].
pub trait StateDbExt: StateDb {
    /// Read and decode a CBOR value.
    fn get_cbor<T: DeserializeOwned>(&self, account: &Address, key: &[u8]) -> Result<Option<T>>;

    /// Encode and write a CBOR value.
    fn set_cbor<T: Serialize>(&self, account: &Address, key: &[u8], value: &T) -> Result<()>;
}

impl<S: StateDb + ?Sized> StateDbExt for S {
    fn get_cbor<T: DeserializeOwned>(&self, account: &Address, key: &[u8]) -> Result<Option<T>> {
        match self.get(account, key)? {
            Some(bytes) => ciborium::from_reader(&bytes[..])
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn set_cbor<T: Serialize>(&self, account: &Address, key: &[u8], value: &T) -> Result<()> {
        let mut bytes = Vec::new();
        ciborium::into_writer(value, &mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.set(account, key, &bytes)
    }
}
