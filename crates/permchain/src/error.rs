//! Error types for the chain surface.

use thiserror::Error;

use permchain_cim::CimError;
use permchain_core::{Address, CryptoError};
use permchain_perms::{Capability, PermsError, Scope};
use permchain_store::StoreError;

/// Errors from admission, permission calls and configuration.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The signer holds no approved certificate.
    #[error("unapproved identity {0}")]
    UnapprovedIdentity(Address),

    /// The signer lacks the capability the transaction needs.
    #[error("permission denied: {subject} lacks {capability} in {scope}")]
    PermissionDenied {
        subject: Address,
        capability: Capability,
        scope: Scope,
    },

    /// A call to the permission contract could not be decoded or is inconsistent.
    #[error("malformed permission call: {0}")]
    MalformedCall(String),

    /// The transaction signature does not recover to a key.
    #[error("invalid transaction signature: {0}")]
    InvalidSignature(CryptoError),

    /// CBOR encoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Invalid configuration or genesis content.
    #[error("configuration error: {0}")]
    Config(String),

    /// Certificate store error.
    #[error("certificate error: {0}")]
    Cim(#[from] CimError),

    /// Permission table error.
    #[error("permission error: {0}")]
    Perms(#[from] PermsError),

    /// Crypto error outside signature recovery.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChainError {
    /// Whether this is an ordinary transaction rejection.
    ///
    /// Rejections drop the transaction from the pool or the block being
    /// built. This includes permission calls that were authorized but cannot
    /// be applied to current state. Anything else is an infrastructure
    /// failure.
    pub fn is_rejection(&self) -> bool {
        match self {
            ChainError::UnapprovedIdentity(_)
            | ChainError::PermissionDenied { .. }
            | ChainError::MalformedCall(_)
            | ChainError::InvalidSignature(_) => true,
            ChainError::Perms(err) => !matches!(err, PermsError::Store(_)),
            ChainError::Cim(err) => matches!(
                err,
                CimError::InvalidCertificate(_)
                    | CimError::DuplicateIdentity(_)
                    | CimError::UnknownIdentity(_)
            ),
            _ => false,
        }
    }
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
