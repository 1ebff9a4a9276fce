//! Chain configuration and genesis input.
//!
//! Both are read from JSON. Keys and addresses in a genesis file are hex
//! strings (with or without `0x`), certificates are PEM text.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use permchain_cim::CommitteeMember;
use permchain_core::{crypto_suite, Address, KeyCodec, SuiteKind};

use crate::error::{ChainError, Result};

/// Chain-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id mixed into every transaction signing payload.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// The crypto suite. Fixed for the life of the chain.
    #[serde(default = "default_suite")]
    pub suite: SuiteKind,
    /// When off, every correctly signed transaction is admitted.
    #[serde(default = "default_enable_permission")]
    pub enable_permission: bool,
}

fn default_chain_id() -> u64 {
    1
}

fn default_suite() -> SuiteKind {
    SuiteKind::Standard
}

fn default_enable_permission() -> bool {
    true
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            suite: default_suite(),
            enable_permission: default_enable_permission(),
        }
    }
}

impl ChainConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Everything a chain starts from.
#[derive(Debug, Clone)]
pub struct Genesis {
    pub config: ChainConfig,
    /// Committee members seeded with the root and manager roles.
    pub committee: Vec<CommitteeMember>,
    /// Approved certificates, PEM or DER.
    pub certificates: Vec<Vec<u8>>,
}

#[derive(Deserialize)]
struct GenesisFile {
    #[serde(default)]
    config: ChainConfig,
    #[serde(default)]
    committee: Vec<CommitteeFileEntry>,
    #[serde(default)]
    certificates: Vec<String>,
}

#[derive(Deserialize)]
struct CommitteeFileEntry {
    address: String,
    public_key: String,
}

impl Genesis {
    /// Parse a genesis document from JSON text.
    ///
    /// Committee keys are decoded with the configured suite.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: GenesisFile = serde_json::from_str(json)?;
        let suite = crypto_suite(file.config.suite);

        let committee = file
            .committee
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let address = Address::from_hex(&entry.address).map_err(|e| {
                    ChainError::Config(format!("committee member {index}: address: {e}"))
                })?;
                let public_key = suite.public_key_from_hex(&entry.public_key).map_err(|e| {
                    ChainError::Config(format!("committee member {index}: public key: {e}"))
                })?;
                Ok(CommitteeMember {
                    address,
                    public_key,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config: file.config,
            committee,
            certificates: file.certificates.into_iter().map(String::into_bytes).collect(),
        })
    }

    /// Read a genesis file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
