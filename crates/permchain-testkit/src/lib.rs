//! # permchain testkit
//!
//! Testing utilities for permchain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known digests and selectors every node must reproduce
//! - **Generators**: Proptest strategies for suites, keys, digests and permission calls
//! - **Fixtures**: Certified identities and a ready-to-use [`TestChain`]
//!
//! ## Golden Vectors
//!
//! ```rust
//! use permchain_testkit::vectors::verify_all_vectors;
//!
//! assert_eq!(verify_all_vectors(), Ok(()));
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use permchain_testkit::TestChain;
//!
//! let mut chain = TestChain::new(4, 1);
//! let member = chain.committee[0].clone();
//! let to = chain.users[0].address;
//! let tx = chain.transfer(&member, to);
//! assert!(chain.admit(&tx).is_ok());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{Identity, TestChain};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
