//! Transactions and their signing payload.
//!
//! The signing payload is a CBOR array:
//!
//! ```text
//! [chain_id, nonce, to | null, value (16-byte BE), gas_limit, gas_price, data]
//! ```
//!
//! and the signing digest is the suite hash of that encoding. Changing it
//! breaks every existing signature.

use ciborium::value::Value;

use permchain_core::{Address, CryptoSuite, Digest, PrivateKey, Signature, Signer, H256};

use crate::error::{ChainError, Result};

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    /// Recipient. `None` creates a contract.
    pub to: Option<Address>,
    pub value: u128,
    pub gas_limit: u64,
    pub gas_price: u64,
    /// Call data, or contract code on creation.
    pub data: Vec<u8>,
    pub signature: Signature,
}

impl Transaction {
    /// An unsigned value transfer.
    pub fn transfer(nonce: u64, to: Address, value: u128) -> Self {
        Self::unsigned(nonce, Some(to), value, Vec::new())
    }

    /// An unsigned call carrying `data`.
    pub fn call(nonce: u64, to: Address, data: Vec<u8>) -> Self {
        Self::unsigned(nonce, Some(to), 0, data)
    }

    /// An unsigned contract creation.
    pub fn create(nonce: u64, code: Vec<u8>) -> Self {
        Self::unsigned(nonce, None, 0, code)
    }

    fn unsigned(nonce: u64, to: Option<Address>, value: u128, data: Vec<u8>) -> Self {
        Self {
            nonce,
            to,
            value,
            gas_limit: 21_000,
            gas_price: 1,
            data,
            signature: Signature::ZERO,
        }
    }

    /// Whether this creates a contract.
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// Signs transactions and recovers their senders for one chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSigner {
    chain_id: u64,
}

impl TxSigner {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The canonical bytes a signature covers.
    pub fn payload(&self, tx: &Transaction) -> Result<Vec<u8>> {
        let to = match &tx.to {
            Some(addr) => Value::Bytes(addr.as_bytes().to_vec()),
            None => Value::Null,
        };
        let value = Value::Array(vec![
            Value::Integer(self.chain_id.into()),
            Value::Integer(tx.nonce.into()),
            to,
            Value::Bytes(tx.value.to_be_bytes().to_vec()),
            Value::Integer(tx.gas_limit.into()),
            Value::Integer(tx.gas_price.into()),
            Value::Bytes(tx.data.clone()),
        ]);

        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf)
            .map_err(|e| ChainError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// The digest a signature covers.
    pub fn signing_hash(&self, suite: &dyn CryptoSuite, tx: &Transaction) -> Result<H256> {
        Ok(suite.hash(&self.payload(tx)?))
    }

    /// Sign `tx` in place.
    pub fn sign(&self, suite: &dyn CryptoSuite, tx: &mut Transaction, key: &PrivateKey) -> Result<()> {
        let digest = self.signing_hash(suite, tx)?;
        tx.signature = suite.sign(&digest, key)?;
        Ok(())
    }

    /// Recover the sender of a signed transaction.
    pub fn sender(&self, suite: &dyn CryptoSuite, tx: &Transaction) -> Result<Address> {
        let digest = self.signing_hash(suite, tx)?;
        suite
            .recover_address(&digest, &tx.signature)
            .map_err(ChainError::InvalidSignature)
    }
}
