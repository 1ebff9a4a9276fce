//! Golden digest vectors.
//!
//! Published test vectors for the hashes every node must compute
//! identically. A mismatch here means addresses, selectors and signing
//! digests diverge from other implementations.

use permchain_core::{crypto_suite, keccak256, method_id, Digest, SuiteKind};

/// What a vector exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorKind {
    /// Suite-independent Keccak-256.
    Keccak,
    /// The content hash of a suite.
    Suite(SuiteKind),
    /// A four-byte call selector; the input is a method signature.
    Selector,
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub kind: VectorKind,
    pub input: &'static [u8],
    /// Expected output (hex).
    pub expected: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "keccak256 of empty input",
            kind: VectorKind::Keccak,
            input: b"",
            expected: "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
        },
        GoldenVector {
            name: "keccak256 of abc",
            kind: VectorKind::Keccak,
            input: b"abc",
            expected: "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45",
        },
        GoldenVector {
            name: "standard suite hash of abc",
            kind: VectorKind::Suite(SuiteKind::Standard),
            input: b"abc",
            expected: "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45",
        },
        GoldenVector {
            name: "national suite hash of abc",
            kind: VectorKind::Suite(SuiteKind::National),
            input: b"abc",
            expected: "66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0",
        },
        GoldenVector {
            name: "transfer selector",
            kind: VectorKind::Selector,
            input: b"transfer(address,uint256)",
            expected: "a9059cbb",
        },
    ]
}

/// Compute the output of a vector.
pub fn compute(vector: &GoldenVector) -> String {
    match vector.kind {
        VectorKind::Keccak => keccak256(vector.input).to_hex(),
        VectorKind::Suite(kind) => crypto_suite(kind).hash(vector.input).to_hex(),
        VectorKind::Selector => {
            let signature = String::from_utf8_lossy(vector.input);
            hex::encode(method_id(&signature))
        }
    }
}

/// Check every vector, returning the names of those that do not match.
pub fn verify_all_vectors() -> Result<(), Vec<&'static str>> {
    let failed: Vec<&'static str> = all_vectors()
        .iter()
        .filter(|v| compute(v) != v.expected)
        .map(|v| v.name)
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        assert_eq!(verify_all_vectors(), Ok(()));
    }

    #[test]
    fn test_vector_names_are_unique() {
        let vectors = all_vectors();
        let mut names: Vec<_> = vectors.iter().map(|v| v.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), vectors.len());
    }
}
