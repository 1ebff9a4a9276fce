//! Key and signature containers shared by both crypto suites.
//!
//! These types only carry bytes. All curve arithmetic happens inside the
//! suites, which tag every key they produce so a key from one suite is
//! never silently used by the other.

use std::fmt;

use crate::error::{CryptoError, Result};
use crate::suite::SuiteKind;

/// Length of a serialized private scalar.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of an uncompressed SEC1 public key (`0x04 || x || y`).
pub const PUBLIC_KEY_LEN: usize = 65;

/// Length of a compressed SEC1 public key (`0x02|0x03 || x`).
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// Length of a recoverable signature (`r || s || v`).
pub const SIGNATURE_LEN: usize = 65;

/// A private scalar, tagged with the suite that created it.
///
/// The suite tag lives in memory only. Serialized keys are bare scalars.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    suite: SuiteKind,
    bytes: [u8; PRIVATE_KEY_LEN],
}

impl PrivateKey {
    /// Wrap a scalar that the suite has already validated.
    pub(crate) fn new(suite: SuiteKind, bytes: [u8; PRIVATE_KEY_LEN]) -> Self {
        Self { suite, bytes }
    }

    /// The suite this key belongs to.
    pub fn suite(&self) -> SuiteKind {
        self.suite
    }

    /// Get the raw scalar bytes (secret key material).
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.bytes
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub(crate) fn expect_suite(&self, expected: SuiteKind) -> Result<()> {
        check_suite(expected, self.suite)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, <redacted>)", self.suite)
    }
}

/// An uncompressed public key point, tagged with its suite.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    suite: SuiteKind,
    bytes: [u8; PUBLIC_KEY_LEN],
}

impl PublicKey {
    pub(crate) fn new(suite: SuiteKind, bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self { suite, bytes }
    }

    /// The suite this key belongs to.
    pub fn suite(&self) -> SuiteKind {
        self.suite
    }

    /// The 65-byte uncompressed encoding.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.bytes
    }

    /// The 64-byte point body (`x || y`), without the SEC1 tag byte.
    pub fn body(&self) -> &[u8] {
        &self.bytes[1..]
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub(crate) fn expect_suite(&self, expected: SuiteKind) -> Result<()> {
        check_suite(expected, self.suite)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, {}...)", self.suite, &self.to_hex()[..18])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// A 65-byte recoverable signature: `r (32) || s (32) || v (1)`.
///
/// `v` is the recovery byte. Signatures are not suite-tagged; a signature
/// produced under one suite simply fails to verify or recover under the other.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice that must be exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignatureEncoding(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// The `r || s` part.
    pub fn rs(&self) -> &[u8] {
        &self.0[..64]
    }

    /// The recovery byte.
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The zero signature (invalid, used as placeholder).
    pub const ZERO: Self = Self([0u8; SIGNATURE_LEN]);
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_LEN]> for Signature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }
}

fn check_suite(expected: SuiteKind, actual: SuiteKind) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CryptoError::SuiteMismatch { expected, actual })
    }
}
