//! The permission contract: applies permission calls to state.
//!
//! This is the one place where the table and the certificate store are
//! mutated after genesis. Each call is authorized against the state it is
//! about to change, then applied and persisted. The table's mutation methods
//! assume exactly this and do not check again.

use std::sync::Arc;

use permchain_cim::CertificateStore;
use permchain_core::{Address, CryptoSuite, Digest};
use permchain_perms::{Capability, PermissionTable, Scope};
use permchain_store::StateDb;

use crate::call::PermissionCall;
use crate::error::{ChainError, Result};

/// The state change a permission call made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Granted {
        member: Address,
        capability: Capability,
        scope: Scope,
    },
    Revoked {
        member: Address,
        capability: Capability,
        scope: Scope,
    },
    GroupCreated(Address),
    GroupDeleted(Address),
    CertificateAdded(Address),
    CertificateRemoved(Address),
}

/// Executes permission calls for one chain.
pub struct PermissionContract {
    suite: Arc<dyn CryptoSuite>,
}

impl PermissionContract {
    pub fn new(suite: Arc<dyn CryptoSuite>) -> Self {
        Self { suite }
    }

    /// Authorize `call` for `caller` against `state`, apply it, and persist.
    pub fn execute<S: StateDb + ?Sized>(
        &self,
        caller: &Address,
        call: &PermissionCall,
        block: u64,
        state: &S,
    ) -> Result<Effect> {
        let mut table = PermissionTable::load(state)?;
        let requirement = call.requirement()?;
        let auth = table
            .authorize(
                caller,
                &requirement.group(),
                &requirement.contract(),
                requirement.capability,
            )
            .ok_or(ChainError::PermissionDenied {
                subject: *caller,
                capability: requirement.capability,
                scope: requirement.scope,
            })?;

        let effect = match call {
            PermissionCall::Grant {
                contract,
                member,
                group,
                capability,
            } => {
                table.grant(member, group, contract, *capability)?;
                table.save(state)?;
                Effect::Granted {
                    member: *member,
                    capability: *capability,
                    scope: requirement.scope,
                }
            }
            PermissionCall::Revoke {
                contract,
                member,
                group,
                capability,
            } => {
                table.revoke(member, group, contract, *capability)?;
                table.save(state)?;
                Effect::Revoked {
                    member: *member,
                    capability: *capability,
                    scope: requirement.scope,
                }
            }
            PermissionCall::CreateGroup { name } => {
                let group = self.group_address(caller, name);
                table.create_group(caller, name.as_str(), &group, block)?;
                table.save(state)?;
                Effect::GroupCreated(group)
            }
            PermissionCall::DeleteGroup { group } => {
                table.delete_group(group)?;
                table.save(state)?;
                Effect::GroupDeleted(*group)
            }
            PermissionCall::AddCertificate { certificate } => {
                let mut certs = CertificateStore::load(self.suite.clone(), state)?;
                let holder = certs.add_certificate(&auth, certificate)?;
                certs.save(state)?;
                Effect::CertificateAdded(holder)
            }
            PermissionCall::RemoveCertificate { holder } => {
                let mut certs = CertificateStore::load(self.suite.clone(), state)?;
                certs.remove_certificate(&auth, holder)?;
                certs.save(state)?;
                Effect::CertificateRemoved(*holder)
            }
        };

        tracing::debug!(
            caller = %auth.subject(),
            capability = %auth.capability(),
            block,
            ?effect,
            "permission call applied"
        );
        Ok(effect)
    }

    /// Register a contract created by `creator`. The creator manages it.
    pub fn record_contract_creation<S: StateDb + ?Sized>(
        &self,
        creator: &Address,
        contract: &Address,
        block: u64,
        state: &S,
    ) -> Result<()> {
        let mut table = PermissionTable::load(state)?;
        table.register_contract(creator, contract, block)?;
        table.save(state)?;
        tracing::debug!(%contract, %creator, block, "contract registered");
        Ok(())
    }

    /// Address of the group `creator` creates under `name`.
    pub fn group_address(&self, creator: &Address, name: &str) -> Address {
        let digest = self.suite.hash_parts(&[&creator.as_bytes()[..], name.as_bytes()]);
        Address::from_digest(&digest)
    }

    /// Address of the contract `sender` creates with `nonce`.
    pub fn contract_address(&self, sender: &Address, nonce: u64) -> Address {
        let digest = self.suite.hash_parts(&[&sender.as_bytes()[..], &nonce.to_be_bytes()[..]]);
        Address::from_digest(&digest)
    }
}
