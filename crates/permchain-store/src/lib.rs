//! # permchain store
//!
//! The state accessor the permission layer reads and writes through.
//!
//! The core owns no storage format of its own: the certificate set, the
//! permission table and the bootstrap marker are all rows under
//! `(account, key)` in whatever [`StateDb`] the chain hands in.
//!
//! ## Key Types
//!
//! - [`StateDb`] - The synchronous accessor trait
//! - [`StateDbExt`] - CBOR helpers on top of any accessor
//! - [`SqliteState`] - SQLite-backed persistent state
//! - [`MemoryState`] - In-memory state for tests and pools
//!
//! ## Usage
//!
//! ```rust
//! use permchain_core::PERMISSION_CONTRACT_ADDRESS;
//! use permchain_store::{SqliteState, StateDb};
//!
//! let state = SqliteState::open_memory().unwrap();
//! state.set(&PERMISSION_CONTRACT_ADDRESS, b"key", b"value").unwrap();
//! assert_eq!(
//!     state.get(&PERMISSION_CONTRACT_ADDRESS, b"key").unwrap(),
//!     Some(b"value".to_vec())
//! );
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryState;
pub use sqlite::SqliteState;
pub use traits::{StateDb, StateDbExt};
