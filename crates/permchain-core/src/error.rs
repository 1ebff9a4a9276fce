//! Error types for permchain core.

use thiserror::Error;

use crate::suite::SuiteKind;

/// Errors raised by the crypto suites.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("invalid point encoding: {0}")]
    InvalidPointEncoding(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("key belongs to the {actual:?} suite, expected {expected:?}")]
    SuiteMismatch { expected: SuiteKind, actual: SuiteKind },

    #[error("entropy source failure: {0}")]
    Entropy(String),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
