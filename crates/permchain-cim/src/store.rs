//! The certificate store.
//!
//! Holds the set of approved identities. It is loaded once from genesis,
//! persisted under the permission contract account, and afterwards only
//! changed by permission-governed transactions: [`CertificateStore::add_certificate`]
//! and [`CertificateStore::remove_certificate`] demand an [`Authorization`]
//! for the matching certificate capability.
//!
//! Besides the certificate list, [`CertificateStore::save`] keeps one row per
//! approved address under [`APPROVED_PREFIX`]. Admission reads only that row
//! through [`is_approved_in`] and never decodes certificates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use permchain_core::{Address, CryptoSuite, PublicKey, PERMISSION_CONTRACT_ADDRESS};
use permchain_perms::{Authorization, Capability, PermissionTable};
use permchain_store::{StateDb, StateDbExt};

use crate::certificate::Certificate;
use crate::error::{CimError, Result};

/// State key of the persisted certificate set.
pub const CERTIFICATES_KEY: &[u8] = b"cim/certificates";

/// State key of the bootstrap marker. Holds the genesis block number.
pub const INITIALIZED_KEY: &[u8] = b"cim/initialized";

/// Key prefix of the approval index. The address bytes follow it.
pub const APPROVED_PREFIX: &[u8] = b"cim/approved/";

/// A committee member as declared in genesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitteeMember {
    pub address: Address,
    pub public_key: PublicKey,
}

#[derive(Serialize, Deserialize)]
struct CertificateRecord {
    der: Vec<u8>,
}

/// The approved identity set.
pub struct CertificateStore {
    suite: Arc<dyn CryptoSuite>,
    certs: HashMap<Address, Certificate>,
    /// Removed since load; their index rows are dropped on save.
    removed: HashSet<Address>,
}

impl CertificateStore {
    /// Create an empty store for `suite`.
    pub fn new(suite: Arc<dyn CryptoSuite>) -> Self {
        Self {
            suite,
            certs: HashMap::new(),
            removed: HashSet::new(),
        }
    }

    /// Load the genesis certificate list (PEM or DER each).
    ///
    /// Either every certificate loads or none does.
    pub fn load_genesis_certificates<T: AsRef<[u8]>>(&mut self, raw_list: &[T]) -> Result<()> {
        let mut loaded = HashMap::with_capacity(raw_list.len());
        for (index, raw) in raw_list.iter().enumerate() {
            let cert = Certificate::parse(self.suite.as_ref(), raw.as_ref())
                .map_err(|reason| CimError::MalformedCertificate { index, reason })?;
            let address = *cert.address();
            if loaded.contains_key(&address) || self.certs.contains_key(&address) {
                return Err(CimError::DuplicateIdentity(address));
            }
            loaded.insert(address, cert);
        }

        self.certs.extend(loaded);
        tracing::debug!(count = raw_list.len(), "loaded genesis certificates");
        Ok(())
    }

    /// Whether `address` holds an approved certificate.
    pub fn is_approved(&self, address: &Address) -> bool {
        self.certs.contains_key(address)
    }

    /// The certificate of `address`.
    pub fn certificate(&self, address: &Address) -> Option<&Certificate> {
        self.certs.get(address)
    }

    /// All certificates, ordered by address.
    pub fn certificates(&self) -> Vec<&Certificate> {
        let mut certs: Vec<&Certificate> = self.certs.values().collect();
        certs.sort_by_key(|c| *c.address());
        certs
    }

    /// Number of approved identities.
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Whether no identity is approved.
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// The suite certificates are decoded with.
    pub fn suite(&self) -> &Arc<dyn CryptoSuite> {
        &self.suite
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission-governed mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Approve a new identity. Requires an `AddCertPerm` authorization.
    pub fn add_certificate(&mut self, auth: &Authorization, raw: &[u8]) -> Result<Address> {
        expect_capability(auth, Capability::AddCertPerm)?;
        let cert =
            Certificate::parse(self.suite.as_ref(), raw).map_err(CimError::InvalidCertificate)?;
        let address = *cert.address();
        if self.certs.contains_key(&address) {
            return Err(CimError::DuplicateIdentity(address));
        }
        self.certs.insert(address, cert);
        self.removed.remove(&address);
        tracing::debug!(%address, by = %auth.subject(), "certificate added");
        Ok(address)
    }

    /// Withdraw an identity. Requires a `DelCertPerm` authorization.
    pub fn remove_certificate(
        &mut self,
        auth: &Authorization,
        address: &Address,
    ) -> Result<Certificate> {
        expect_capability(auth, Capability::DelCertPerm)?;
        let cert = self
            .certs
            .remove(address)
            .ok_or(CimError::UnknownIdentity(*address))?;
        self.removed.insert(*address);
        tracing::debug!(%address, by = %auth.subject(), "certificate removed");
        Ok(cert)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the certificate set from state. A chain with none yields an empty store.
    pub fn load<S: StateDb + ?Sized>(suite: Arc<dyn CryptoSuite>, state: &S) -> Result<Self> {
        let mut store = Self::new(suite);
        let records: Option<Vec<CertificateRecord>> =
            state.get_cbor(&PERMISSION_CONTRACT_ADDRESS, CERTIFICATES_KEY)?;
        let ders: Vec<Vec<u8>> = records
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.der)
            .collect();
        store.load_genesis_certificates(&ders)?;
        Ok(store)
    }

    /// Write the certificate set and the approval index to state.
    pub fn save<S: StateDb + ?Sized>(&self, state: &S) -> Result<()> {
        let records: Vec<CertificateRecord> = self
            .certificates()
            .into_iter()
            .map(|c| CertificateRecord {
                der: c.der().to_vec(),
            })
            .collect();
        state.set_cbor(&PERMISSION_CONTRACT_ADDRESS, CERTIFICATES_KEY, &records)?;

        for address in &self.removed {
            state.delete(&PERMISSION_CONTRACT_ADDRESS, &approval_key(address))?;
        }
        for address in self.certs.keys() {
            state.set(&PERMISSION_CONTRACT_ADDRESS, &approval_key(address), &[1])?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Genesis bootstrap
    // ─────────────────────────────────────────────────────────────────────────

    /// Write the certificate set and the genesis permission table to state.
    ///
    /// Runs once per chain: a second call fails with
    /// [`CimError::AlreadyInitialized`] and leaves state untouched. Every
    /// committee address must be the address of its public key and hold a
    /// certificate in this store.
    pub fn init_cert_and_permission<S: StateDb + ?Sized>(
        &self,
        block_number: u64,
        committee: &[CommitteeMember],
        state: &S,
    ) -> Result<()> {
        if let Some(block) = initialized_at(state)? {
            return Err(CimError::AlreadyInitialized { block });
        }

        for (index, member) in committee.iter().enumerate() {
            let derived = self.suite.address_of(&member.public_key)?;
            if derived != member.address {
                return Err(CimError::CommitteeKeyMismatch {
                    index,
                    address: member.address,
                });
            }
            if !self.is_approved(&member.address) {
                return Err(CimError::UncertifiedCommitteeMember {
                    index,
                    address: member.address,
                });
            }
        }

        self.save(state)?;
        PermissionTable::genesis(committee.iter().map(|m| &m.address)).save(state)?;
        state.set_cbor(&PERMISSION_CONTRACT_ADDRESS, INITIALIZED_KEY, &block_number)?;

        tracing::info!(
            block = block_number,
            certificates = self.len(),
            committee = committee.len(),
            "initialized certificates and permissions"
        );
        Ok(())
    }
}

/// The block the chain was bootstrapped at, if it was.
pub fn initialized_at<S: StateDb + ?Sized>(state: &S) -> Result<Option<u64>> {
    Ok(state.get_cbor(&PERMISSION_CONTRACT_ADDRESS, INITIALIZED_KEY)?)
}

/// Whether `address` is approved, read from the approval index in `state`.
pub fn is_approved_in<S: StateDb + ?Sized>(state: &S, address: &Address) -> Result<bool> {
    Ok(state.contains(&PERMISSION_CONTRACT_ADDRESS, &approval_key(address))?)
}

fn approval_key(address: &Address) -> Vec<u8> {
    [APPROVED_PREFIX, &address.as_bytes()[..]].concat()
}

fn expect_capability(auth: &Authorization, expected: Capability) -> Result<()> {
    if auth.capability() != expected {
        return Err(CimError::WrongAuthorization {
            expected,
            actual: auth.capability(),
        });
    }
    Ok(())
}
