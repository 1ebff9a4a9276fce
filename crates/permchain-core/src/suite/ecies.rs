//! ECIES framing shared by both suites.
//!
//! `ephemeral_pub (65) || nonce (12) || aead ciphertext+tag (16)`.
//! The key agreement is done by the suite; this module derives the
//! symmetric key with the suite hash and runs the AEAD.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, Payload};
use aes_gcm::aead::generic_array::typenum::Unsigned;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, Result};
use crate::hash::Digest;
use crate::keys::PUBLIC_KEY_LEN;

/// GCM nonce length for both ciphers.
pub(crate) const NONCE_LEN: usize = 12;

/// GCM tag length for both ciphers.
pub(crate) const TAG_LEN: usize = 16;

/// Derive a `len`-byte symmetric key from the ECDH shared secret.
///
/// `hash(shared || counter=1 (u32 BE) || s1)`, truncated.
pub(crate) fn derive_key<D: Digest + ?Sized>(
    digest: &D,
    shared: &[u8],
    s1: &[u8],
    len: usize,
) -> Vec<u8> {
    let block = digest.hash_parts(&[shared, &1u32.to_be_bytes()[..], s1]);
    block.as_bytes()[..len].to_vec()
}

/// Encrypt and frame.
pub(crate) fn seal<A>(
    ephemeral_pub: &[u8; PUBLIC_KEY_LEN],
    key: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>>
where
    A: Aead + KeyInit,
{
    let cipher =
        A::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut nonce = vec![0u8; <A as AeadCore>::NonceSize::USIZE];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(
            aes_gcm::aead::Nonce::<A>::from_slice(&nonce),
            Payload { msg: plaintext, aad },
        )
        .map_err(|_| CryptoError::EncryptionFailed("AEAD seal failed".into()))?;

    let mut out = Vec::with_capacity(PUBLIC_KEY_LEN + nonce.len() + ciphertext.len());
    out.extend_from_slice(ephemeral_pub);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Split a framed ciphertext into `(ephemeral_pub, nonce, body)`.
pub(crate) fn split(framed: &[u8]) -> Result<(&[u8], &[u8], &[u8])> {
    if framed.len() < PUBLIC_KEY_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let (ephemeral, rest) = framed.split_at(PUBLIC_KEY_LEN);
    let (nonce, body) = rest.split_at(NONCE_LEN);
    Ok((ephemeral, nonce, body))
}

/// Decrypt a split body.
pub(crate) fn open<A>(key: &[u8], nonce: &[u8], body: &[u8], aad: &[u8]) -> Result<Vec<u8>>
where
    A: Aead + KeyInit,
{
    if nonce.len() != <A as AeadCore>::NonceSize::USIZE {
        return Err(CryptoError::DecryptionFailed);
    }
    let cipher = A::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt(
            aes_gcm::aead::Nonce::<A>::from_slice(nonce),
            Payload { msg: body, aad },
        )
        .map_err(|_| CryptoError::DecryptionFailed)
}
