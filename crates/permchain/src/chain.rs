//! The chain facade.
//!
//! Ties the pieces together for the block builder and the transaction pool:
//! genesis commit, admission, and applying the permission effects of an
//! admitted transaction.

use std::sync::Arc;

use permchain_cim::CertificateStore;
use permchain_core::{crypto_suite, Address, CryptoSuite};
use permchain_store::StateDb;

use crate::config::{ChainConfig, Genesis};
use crate::error::Result;
use crate::executor::{Effect, PermissionContract};
use crate::gate::{Admission, AuthorizationGate, TxKind};
use crate::transaction::{Transaction, TxSigner};

/// What applying a transaction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Nothing permission-related changed.
    Transfer,
    /// A contract was created and registered at this address.
    ContractCreated(Address),
    /// A permission call took effect.
    Permission(Effect),
}

/// Result of [`Chain::apply_transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub signer: Address,
    pub applied: Applied,
}

/// A permissioned chain: one suite, one genesis, one gate.
pub struct Chain {
    genesis: Genesis,
    suite: Arc<dyn CryptoSuite>,
    signer: TxSigner,
    gate: AuthorizationGate,
    contract: PermissionContract,
}

impl Chain {
    /// Build the chain from its genesis. The suite comes from the genesis config.
    pub fn new(genesis: Genesis) -> Self {
        let suite = crypto_suite(genesis.config.suite);
        Self {
            signer: TxSigner::new(genesis.config.chain_id),
            gate: AuthorizationGate::new(suite.clone(), &genesis.config),
            contract: PermissionContract::new(suite.clone()),
            suite,
            genesis,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.genesis.config
    }

    pub fn suite(&self) -> &Arc<dyn CryptoSuite> {
        &self.suite
    }

    pub fn tx_signer(&self) -> &TxSigner {
        &self.signer
    }

    pub fn permission_contract(&self) -> &PermissionContract {
        &self.contract
    }

    /// Load the genesis certificates and write them, with the genesis
    /// permission table, to `state`.
    ///
    /// A bad certificate aborts before anything is written. Fails if the
    /// chain was already bootstrapped.
    pub fn commit_genesis<S: StateDb + ?Sized>(&self, state: &S, block: u64) -> Result<()> {
        let mut certs = CertificateStore::new(self.suite.clone());
        certs.load_genesis_certificates(&self.genesis.certificates)?;
        certs.init_cert_and_permission(block, &self.genesis.committee, state)?;
        Ok(())
    }

    /// Admission check for the transaction pool.
    pub fn admit_pending<S: StateDb + ?Sized>(
        &self,
        tx: &Transaction,
        state: &S,
    ) -> Result<Admission> {
        self.admit(tx, state, "pool")
    }

    /// Admission check for block building.
    pub fn admit_to_block<S: StateDb + ?Sized>(
        &self,
        tx: &Transaction,
        state: &S,
    ) -> Result<Admission> {
        self.admit(tx, state, "block")
    }

    fn admit<S: StateDb + ?Sized>(
        &self,
        tx: &Transaction,
        state: &S,
        path: &'static str,
    ) -> Result<Admission> {
        self.gate.verify_permission(tx, state).map_err(|err| {
            if err.is_rejection() {
                tracing::debug!(path, nonce = tx.nonce, error = %err, "transaction rejected");
            } else {
                tracing::warn!(path, nonce = tx.nonce, error = %err, "admission failed");
            }
            err
        })
    }

    /// Admit `tx` into block `block` and apply its permission effects.
    pub fn apply_transaction<S: StateDb + ?Sized>(
        &self,
        tx: &Transaction,
        block: u64,
        state: &S,
    ) -> Result<Outcome> {
        let admission = self.admit_to_block(tx, state)?;
        let signer = admission.signer;

        let applied = match admission.kind {
            TxKind::CreateContract => {
                let created = self.contract.contract_address(&signer, tx.nonce);
                self.contract
                    .record_contract_creation(&signer, &created, block, state)?;
                Applied::ContractCreated(created)
            }
            TxKind::Permission(call) => {
                Applied::Permission(self.contract.execute(&signer, &call, block, state)?)
            }
            TxKind::Transfer | TxKind::GroupTransfer(_) | TxKind::ContractCall(_) => {
                Applied::Transfer
            }
        };

        Ok(Outcome { signer, applied })
    }
}
