//! Error types for certificate identity management.

use thiserror::Error;

use permchain_core::{Address, CryptoError};
use permchain_perms::{Capability, PermsError};
use permchain_store::StoreError;

/// Errors from the certificate store and the genesis bootstrap.
#[derive(Debug, Error)]
pub enum CimError {
    /// A genesis or stored certificate could not be parsed, or its key is
    /// not valid for the suite.
    #[error("malformed certificate at index {index}: {reason}")]
    MalformedCertificate { index: usize, reason: String },

    /// A certificate submitted in a transaction could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Two certificates resolve to the same address.
    #[error("duplicate identity {0}")]
    DuplicateIdentity(Address),

    /// No certificate is registered for this address.
    #[error("unknown identity {0}")]
    UnknownIdentity(Address),

    /// The chain already went through its bootstrap.
    #[error("certificates and permissions already initialized at block {block}")]
    AlreadyInitialized { block: u64 },

    /// A committee address does not belong to the committee public key.
    #[error("committee member {index}: address {address} does not match its public key")]
    CommitteeKeyMismatch { index: usize, address: Address },

    /// A committee member holds no genesis certificate.
    #[error("committee member {index}: {address} has no certificate")]
    UncertifiedCommitteeMember { index: usize, address: Address },

    /// The authorization presented was minted for a different capability.
    #[error("authorization is for {actual}, expected {expected}")]
    WrongAuthorization {
        expected: Capability,
        actual: Capability,
    },

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Permission table error.
    #[error("permission error: {0}")]
    Perms(#[from] PermsError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for certificate operations.
pub type Result<T> = std::result::Result<T, CimError>;
