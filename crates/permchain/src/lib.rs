//! # permchain
//!
//! Identity and authorization for a permissioned chain.
//!
//! ## Overview
//!
//! A transaction is admitted only if
//!
//! 1. its signature recovers to a key under the chain's crypto suite,
//! 2. the signer holds an approved certificate, and
//! 3. the permission table grants the signer the capability the
//!    transaction needs (send, create a contract, call a contract, or
//!    change permissions).
//!
//! The pool and the block builder share one [`AuthorizationGate`], so they
//! never disagree about the same transaction against the same state.
//!
//! ## Usage
//!
//! ```rust
//! use permchain::{Chain, ChainConfig, Genesis, Transaction};
//! use permchain::core::{Address, KeyCodec};
//! use permchain::store::MemoryState;
//!
//! let chain = Chain::new(Genesis {
//!     config: ChainConfig { enable_permission: false, ..ChainConfig::default() },
//!     committee: Vec::new(),
//!     certificates: Vec::new(),
//! });
//! let state = MemoryState::new();
//! chain.commit_genesis(&state, 0).unwrap();
//!
//! let key = chain.suite().generate_key().unwrap();
//! let mut tx = Transaction::transfer(0, Address::from_bytes([7; 20]), 100);
//! chain.tx_signer().sign(chain.suite().as_ref(), &mut tx, &key).unwrap();
//! assert!(chain.admit_pending(&tx, &state).is_ok());
//! ```
//!
//! ## Re-exports
//!
//! - `permchain::core` - Suites, keys, hashes, addresses
//! - `permchain::store` - State accessors
//! - `permchain::perms` - The permission table
//! - `permchain::cim` - The certificate store

pub mod call;
pub mod chain;
pub mod config;
pub mod error;
pub mod executor;
pub mod gate;
pub mod transaction;

pub use permchain_cim as cim;
pub use permchain_core as core;
pub use permchain_perms as perms;
pub use permchain_store as store;

pub use call::{PermissionCall, Requirement};
pub use chain::{Applied, Chain, Outcome};
pub use config::{ChainConfig, Genesis};
pub use error::{ChainError, Result};
pub use executor::{Effect, PermissionContract};
pub use gate::{classify, requirement_of, Admission, AuthorizationGate, TxKind};
pub use transaction::{Transaction, TxSigner};

pub use permchain_core::{Address, SuiteKind, PERMISSION_CONTRACT_ADDRESS};
pub use permchain_perms::{Capability, Scope};
