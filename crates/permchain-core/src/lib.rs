//! # permchain core
//!
//! Primitives shared by every permchain crate: addresses and digests, the
//! hash helpers, and the two pluggable crypto suites.
//!
//! This crate contains no I/O and no storage. It is pure computation.
//!
//! ## Key Types
//!
//! - [`Address`] - 20-byte account address
//! - [`H256`] - 32-byte digest
//! - [`CryptoSuite`] - Keys, signatures, encryption and hashing of one suite
//! - [`SuiteKind`] - Which suite a chain runs (`national` or `standard`)
//!
//! ## Usage
//!
//! ```rust
//! use permchain_core::{crypto_suite, CryptoSuite, Digest, KeyCodec, Signer, SuiteKind};
//!
//! let suite = crypto_suite(SuiteKind::Standard);
//! let key = suite.generate_key().unwrap();
//! let digest = suite.hash(b"payload");
//! let sig = suite.sign(&digest, &key).unwrap();
//! let signer = suite.recover_address(&digest, &sig).unwrap();
//! assert_eq!(signer, suite.address_of(&suite.public_key_of(&key).unwrap()).unwrap());
//! ```

pub mod error;
pub mod hash;
pub mod keys;
pub mod suite;
pub mod types;

pub use error::{CryptoError, Result};
pub use hash::{keccak256, method_id, Digest};
pub use keys::{
    PrivateKey, PublicKey, Signature, COMPRESSED_PUBLIC_KEY_LEN, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN,
    SIGNATURE_LEN,
};
pub use suite::{
    crypto_suite, Cipher, CryptoSuite, KeyCodec, NationalSuite, Signer, StandardSuite, SuiteKind,
};
pub use types::{Address, H256, ADDRESS_LEN, PERMISSION_CONTRACT_ADDRESS};
