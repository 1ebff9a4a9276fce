//! Pluggable crypto suites.
//!
//! A chain runs exactly one suite, chosen at configuration time and injected
//! into every component as an `Arc<dyn CryptoSuite>`:
//!
//! | suite      | curve   | hash       | cipher      |
//! |------------|---------|------------|-------------|
//! | `National` | SM2     | SM3        | SM4-GCM     |
//! | `Standard` | P-256   | Keccak-256 | AES-256-GCM |
//!
//! The capabilities are split into small traits ([`KeyCodec`], [`Signer`],
//! [`Cipher`], [`Digest`]) so callers can depend on just what they use.

use std::fmt;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};
use crate::hash::Digest;
use crate::keys::{PrivateKey, PublicKey, Signature, COMPRESSED_PUBLIC_KEY_LEN};
use crate::types::{strip_0x, Address, H256};

mod ecies;
mod national;
mod standard;

pub use national::NationalSuite;
pub use standard::StandardSuite;

/// Which suite a chain runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    /// SM2 / SM3 / SM4.
    National,
    /// P-256 / Keccak-256 / AES-256-GCM.
    Standard,
}

impl SuiteKind {
    /// Lowercase name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            SuiteKind::National => "national",
            SuiteKind::Standard => "standard",
        }
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key generation and (de)serialization.
pub trait KeyCodec {
    /// Generate a fresh private key from OS entropy.
    fn generate_key(&self) -> Result<PrivateKey>;

    /// Parse a 32-byte private scalar.
    ///
    /// Rejects wrong lengths, zero, and scalars outside the curve order.
    fn deserialize_private(&self, bytes: &[u8]) -> Result<PrivateKey>;

    /// Serialize a private key to its 32-byte scalar.
    fn serialize_private(&self, key: &PrivateKey) -> Result<Vec<u8>>;

    /// Derive the public key of a private key.
    fn public_key_of(&self, key: &PrivateKey) -> Result<PublicKey>;

    /// Parse a SEC1 public key, uncompressed (65 bytes) or compressed (33 bytes).
    ///
    /// Off-curve points and the identity are rejected.
    fn deserialize_public(&self, bytes: &[u8]) -> Result<PublicKey>;

    /// Serialize a public key in SEC1 form.
    fn serialize_public(&self, key: &PublicKey, compressed: bool) -> Result<Vec<u8>>;

    /// Compress a public key to 33 bytes.
    fn compress_public(&self, key: &PublicKey) -> Result<[u8; COMPRESSED_PUBLIC_KEY_LEN]> {
        let bytes = self.serialize_public(key, true)?;
        bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidPointEncoding(format!(
                "compressed encoding has {} bytes",
                bytes.len()
            ))
        })
    }

    /// Decompress a 33-byte public key.
    fn decompress_public(&self, bytes: &[u8]) -> Result<PublicKey> {
        if bytes.len() != COMPRESSED_PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidPointEncoding(format!(
                "expected {COMPRESSED_PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        self.deserialize_public(bytes)
    }

    /// Import a private key from hex (optional `0x` prefix).
    fn private_key_from_hex(&self, s: &str) -> Result<PrivateKey> {
        let bytes = hex::decode(strip_0x(s.trim()))?;
        self.deserialize_private(&bytes)
    }

    /// Import a public key from hex (optional `0x` prefix).
    fn public_key_from_hex(&self, s: &str) -> Result<PublicKey> {
        let bytes = hex::decode(strip_0x(s.trim()))?;
        self.deserialize_public(&bytes)
    }
}

/// Recoverable signatures over 32-byte digests.
pub trait Signer {
    /// Sign a digest.
    fn sign(&self, digest: &H256, key: &PrivateKey) -> Result<Signature>;

    /// Check a signature against a serialized public key.
    ///
    /// Accepts 64-byte (`r || s`) or 65-byte signatures. Never panics:
    /// anything malformed is simply `false`.
    fn verify_signature(&self, public_key: &[u8], digest: &H256, signature: &[u8]) -> bool;

    /// Recover the public key that produced `signature` over `digest`.
    fn recover_public_key(&self, digest: &H256, signature: &Signature) -> Result<PublicKey>;
}

/// Public-key encryption.
pub trait Cipher {
    /// Encrypt to `key`. `s1` is KDF shared info, `s2` is AEAD associated data.
    ///
    /// Output: `ephemeral_pub (65) || nonce (12) || ciphertext+tag`.
    fn encrypt(&self, key: &PublicKey, plaintext: &[u8], s1: &[u8], s2: &[u8])
        -> Result<Vec<u8>>;

    /// Decrypt with `key`. Any tampering, wrong key, or wrong `s1`/`s2`
    /// yields [`CryptoError::DecryptionFailed`].
    fn decrypt(&self, key: &PrivateKey, ciphertext: &[u8], s1: &[u8], s2: &[u8])
        -> Result<Vec<u8>>;
}

/// The full capability set of a suite.
pub trait CryptoSuite: KeyCodec + Signer + Cipher + Digest + Send + Sync {
    /// Which suite this is.
    fn kind(&self) -> SuiteKind;

    /// Account address of a public key: last 20 bytes of the suite digest
    /// of the 64-byte point body.
    fn address_of(&self, key: &PublicKey) -> Result<Address> {
        key.expect_suite(self.kind())?;
        Ok(Address::from_digest(&self.hash(key.body())))
    }

    /// Recover the signer address of a signature.
    fn recover_address(&self, digest: &H256, signature: &Signature) -> Result<Address> {
        let key = self.recover_public_key(digest, signature)?;
        self.address_of(&key)
    }
}

/// Build the suite for `kind`.
pub fn crypto_suite(kind: SuiteKind) -> Arc<dyn CryptoSuite> {
    match kind {
        SuiteKind::National => Arc::new(NationalSuite),
        SuiteKind::Standard => Arc::new(StandardSuite),
    }
}

/// Draw 32 bytes of OS entropy.
pub(crate) fn random_bytes() -> Result<[u8; 32]> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(bytes)
}

/// Split a 64- or 65-byte signature into its 64-byte `r || s` part.
pub(crate) fn signature_rs(signature: &[u8]) -> Option<&[u8]> {
    match signature.len() {
        64 | 65 => Some(&signature[..64]),
        _ => None,
    }
}
