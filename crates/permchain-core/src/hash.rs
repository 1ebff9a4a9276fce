//! Hash primitives.
//!
//! Two families live here:
//!
//! - Suite-independent helpers ([`keccak256`], [`method_id`]) that every node
//!   computes identically whatever suite the chain runs.
//! - The [`Digest`] capability, implemented by each crypto suite. Its
//!   provided methods build header identities and composite identifiers
//!   out of the suite's content hash, so changing the suite changes every
//!   derived digest consistently.

use sha3::{Digest as _, Keccak256};

use crate::types::H256;

/// Keccak-256 of `data`, independent of the active suite.
pub fn keccak256(data: &[u8]) -> H256 {
    H256(Keccak256::digest(data).into())
}

/// Four-byte call selector of a method signature such as `"delGroupPermission(address)"`.
pub fn method_id(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    let mut id = [0u8; 4];
    id.copy_from_slice(&digest.0[..4]);
    id
}

/// The digest capability of a crypto suite.
pub trait Digest {
    /// General-purpose content digest.
    fn hash(&self, data: &[u8]) -> H256;

    /// Digest of the concatenation of `parts`.
    ///
    /// Suites override this to stream the parts through the hasher.
    fn hash_parts(&self, parts: &[&[u8]]) -> H256 {
        let mut buf = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
        for part in parts {
            buf.extend_from_slice(part);
        }
        self.hash(&buf)
    }

    /// Identity of a block header, given its canonical byte encoding.
    ///
    /// The encoding itself belongs to the chain; only the digest is ours.
    fn header_hash(&self, canonical_header: &[u8]) -> H256 {
        self.hash(canonical_header)
    }

    /// `hash(hash(data))`.
    fn double_hash(&self, data: &[u8]) -> H256 {
        let first = self.hash(data);
        self.hash(first.as_bytes())
    }

    /// Combine any number of digests into one.
    ///
    /// Order-sensitive: inputs are concatenated in the order given.
    fn combine(&self, inputs: &[H256]) -> H256 {
        let parts: Vec<&[u8]> = inputs.iter().map(|h| h.as_bytes().as_slice()).collect();
        self.hash_parts(&parts)
    }
}
