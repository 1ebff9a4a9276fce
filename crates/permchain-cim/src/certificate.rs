//! X.509 certificates bound to chain identities.

use std::fmt;

use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use permchain_core::{Address, CryptoSuite, PublicKey};

/// A parsed certificate and the chain identity it vouches for.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    public_key: PublicKey,
    address: Address,
}

impl Certificate {
    /// Parse a certificate from PEM text or raw DER.
    ///
    /// The subject public key is decoded with `suite`, so a certificate for
    /// a key on another curve is rejected here. Errors carry a
    /// human-readable reason; the store attaches the index.
    pub fn parse(suite: &dyn CryptoSuite, raw: &[u8]) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("empty input".into());
        }

        let der = match pem_start(raw) {
            Some(start) => {
                let (_, pem) = x509_parser::pem::parse_x509_pem(&raw[start..])
                    .map_err(|e| format!("invalid PEM: {e}"))?;
                pem.contents
            }
            None => raw.to_vec(),
        };

        Self::from_der(suite, der)
    }

    /// Parse a DER-encoded certificate.
    pub fn from_der(suite: &dyn CryptoSuite, der: Vec<u8>) -> Result<Self, String> {
        let (_, cert) =
            X509Certificate::from_der(&der).map_err(|e| format!("invalid X.509: {e}"))?;

        let key_bytes = cert.public_key().subject_public_key.data.as_ref();
        let public_key = suite
            .deserialize_public(key_bytes)
            .map_err(|e| format!("subject key not valid for the {} suite: {e}", suite.kind()))?;
        let address = suite.address_of(&public_key).map_err(|e| e.to_string())?;

        Ok(Self {
            der,
            public_key,
            address,
        })
    }

    /// The DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The subject public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// The address of the subject key.
    pub fn address(&self) -> &Address {
        &self.address
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("address", &self.address)
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Offset of the PEM header, if `raw` is PEM text.
fn pem_start(raw: &[u8]) -> Option<usize> {
    let start = raw.iter().position(|b| !b.is_ascii_whitespace())?;
    raw[start..].starts_with(b"-----BEGIN").then_some(start)
}
