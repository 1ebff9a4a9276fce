//! The authorization gate.
//!
//! Every transaction passes through [`AuthorizationGate::verify_permission`]
//! before it enters the pool or a block. Both paths call the same method so a
//! transaction admitted to the pool is admitted to a block against the same
//! state.

use std::sync::Arc;

use permchain_cim::is_approved_in;
use permchain_core::{Address, CryptoSuite, PERMISSION_CONTRACT_ADDRESS};
use permchain_perms::{Capability, PermissionTable, Scope};
use permchain_store::StateDb;

use crate::call::{PermissionCall, Requirement};
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};
use crate::transaction::{Transaction, TxSigner};

/// What a transaction does, as far as permissions are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxKind {
    /// Value transfer to an ordinary account.
    Transfer,
    /// Transfer addressed to a group.
    GroupTransfer(Address),
    /// Contract creation.
    CreateContract,
    /// Call to a registered contract.
    ContractCall(Address),
    /// Call to the permission contract.
    Permission(PermissionCall),
}

/// An admitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// The recovered sender.
    pub signer: Address,
    pub kind: TxKind,
    /// The check that passed. `None` when enforcement is off.
    pub requirement: Option<Requirement>,
}

/// Admit or reject transactions against chain state.
pub struct AuthorizationGate {
    suite: Arc<dyn CryptoSuite>,
    signer: TxSigner,
    enable_permission: bool,
}

impl AuthorizationGate {
    pub fn new(suite: Arc<dyn CryptoSuite>, config: &ChainConfig) -> Self {
        Self {
            suite,
            signer: TxSigner::new(config.chain_id),
            enable_permission: config.enable_permission,
        }
    }

    /// Whether permissions are enforced.
    pub fn enforces_permissions(&self) -> bool {
        self.enable_permission
    }

    /// Decide whether `tx` may be included, reading `state`.
    ///
    /// The caller must not mutate `state` while this runs.
    pub fn verify_permission<S: StateDb + ?Sized>(
        &self,
        tx: &Transaction,
        state: &S,
    ) -> Result<Admission> {
        let signer = self.signer.sender(self.suite.as_ref(), tx)?;
        let table = PermissionTable::load(state)?;

        if !self.enable_permission {
            // undecodable permission calls go through as inert transfers
            let kind = classify(tx, &table).unwrap_or(TxKind::Transfer);
            return Ok(Admission {
                signer,
                kind,
                requirement: None,
            });
        }

        if !is_approved_in(state, &signer)? {
            return Err(ChainError::UnapprovedIdentity(signer));
        }

        let kind = classify(tx, &table)?;
        let requirement = requirement_of(&kind)?;
        let granted = table.check_action_perm(
            &signer,
            &requirement.group(),
            &requirement.contract(),
            requirement.capability,
        );
        if !granted {
            return Err(ChainError::PermissionDenied {
                subject: signer,
                capability: requirement.capability,
                scope: requirement.scope,
            });
        }

        Ok(Admission {
            signer,
            kind,
            requirement: Some(requirement),
        })
    }
}

/// Work out what `tx` does from its recipient and data.
pub fn classify(tx: &Transaction, table: &PermissionTable) -> Result<TxKind> {
    let kind = match tx.to {
        None => TxKind::CreateContract,
        Some(to) if to == PERMISSION_CONTRACT_ADDRESS => {
            TxKind::Permission(PermissionCall::decode(&tx.data)?)
        }
        Some(to) if table.is_contract(&to) => TxKind::ContractCall(to),
        Some(to) if table.is_group(&to) => TxKind::GroupTransfer(to),
        Some(_) => TxKind::Transfer,
    };
    Ok(kind)
}

/// The check a transaction of `kind` must pass.
pub fn requirement_of(kind: &TxKind) -> Result<Requirement> {
    let requirement = match kind {
        TxKind::Transfer => Requirement::new(Capability::SendTx, Scope::Global),
        TxKind::GroupTransfer(group) => Requirement::new(Capability::SendTx, Scope::Group(*group)),
        TxKind::CreateContract => Requirement::new(Capability::CreateContract, Scope::Global),
        TxKind::ContractCall(contract) => {
            Requirement::new(Capability::AccessContract, Scope::Contract(*contract))
        }
        TxKind::Permission(call) => call.requirement()?,
    };
    Ok(requirement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use permchain_core::{crypto_suite, KeyCodec, PrivateKey, SuiteKind};
    use permchain_store::MemoryState;

    fn signed(suite: &Arc<dyn CryptoSuite>, key: &PrivateKey, mut tx: Transaction) -> Transaction {
        TxSigner::new(1).sign(suite.as_ref(), &mut tx, key).unwrap();
        tx
    }

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn test_classify() {
        let mut table = PermissionTable::new();
        table.create_group(&addr(1), "ops", &addr(0x90), 1).unwrap();
        table.register_contract(&addr(1), &addr(0xc0), 1).unwrap();

        let call = PermissionCall::CreateGroup { name: "x".into() };
        let cases = [
            (Transaction::transfer(0, addr(5), 1), TxKind::Transfer),
            (Transaction::transfer(0, addr(0x90), 1), TxKind::GroupTransfer(addr(0x90))),
            (Transaction::create(0, vec![1]), TxKind::CreateContract),
            (Transaction::call(0, addr(0xc0), vec![]), TxKind::ContractCall(addr(0xc0))),
            (
                Transaction::call(0, PERMISSION_CONTRACT_ADDRESS, call.encode().unwrap()),
                TxKind::Permission(call),
            ),
        ];
        for (tx, expected) in cases {
            assert_eq!(classify(&tx, &table).unwrap(), expected);
        }

        let garbage = Transaction::call(0, PERMISSION_CONTRACT_ADDRESS, vec![1, 2]);
        assert!(matches!(classify(&garbage, &table), Err(ChainError::MalformedCall(_))));
    }

    #[test]
    fn test_requirement_of_each_kind() {
        assert_eq!(
            requirement_of(&TxKind::GroupTransfer(addr(0x90))).unwrap(),
            Requirement::new(Capability::SendTx, Scope::Group(addr(0x90)))
        );
        assert_eq!(
            requirement_of(&TxKind::ContractCall(addr(0xc0))).unwrap(),
            Requirement::new(Capability::AccessContract, Scope::Contract(addr(0xc0)))
        );
        assert_eq!(
            requirement_of(&TxKind::CreateContract).unwrap().capability,
            Capability::CreateContract
        );
    }

    #[test]
    fn test_disabled_permission_admits_any_signer() {
        let suite = crypto_suite(SuiteKind::Standard);
        let config = ChainConfig {
            enable_permission: false,
            ..ChainConfig::default()
        };
        let gate = AuthorizationGate::new(suite.clone(), &config);
        let key = suite.generate_key().unwrap();
        let expected = suite.address_of(&suite.public_key_of(&key).unwrap()).unwrap();

        let tx = signed(&suite, &key, Transaction::transfer(0, addr(5), 1));
        let admission = gate.verify_permission(&tx, &MemoryState::new()).unwrap();
        assert_eq!(admission.signer, expected);
        assert_eq!(admission.requirement, None);

        let garbage = signed(
            &suite,
            &key,
            Transaction::call(1, PERMISSION_CONTRACT_ADDRESS, vec![0xde, 0xad]),
        );
        let admission = gate.verify_permission(&garbage, &MemoryState::new()).unwrap();
        assert_eq!(admission.kind, TxKind::Transfer);
    }

    #[test]
    fn test_unapproved_identity() {
        let suite = crypto_suite(SuiteKind::Standard);
        let gate = AuthorizationGate::new(suite.clone(), &ChainConfig::default());
        let key = suite.generate_key().unwrap();

        let tx = signed(&suite, &key, Transaction::transfer(0, addr(5), 1));
        let err = gate.verify_permission(&tx, &MemoryState::new()).unwrap_err();
        assert!(matches!(err, ChainError::UnapprovedIdentity(_)));
        assert!(err.is_rejection());
    }

    #[test]
    fn test_approval_read_from_index() {
        use permchain_cim::APPROVED_PREFIX;

        let suite = crypto_suite(SuiteKind::Standard);
        let gate = AuthorizationGate::new(suite.clone(), &ChainConfig::default());
        let key = suite.generate_key().unwrap();
        let signer = suite.address_of(&suite.public_key_of(&key).unwrap()).unwrap();

        let state = MemoryState::new();
        PermissionTable::genesis(&[signer]).save(&state).unwrap();
        // an index row with no certificate list behind it
        let row = [APPROVED_PREFIX, &signer.as_bytes()[..]].concat();
        state.set(&PERMISSION_CONTRACT_ADDRESS, &row, &[1]).unwrap();

        let tx = signed(&suite, &key, Transaction::transfer(0, addr(5), 1));
        assert_eq!(gate.verify_permission(&tx, &state).unwrap().signer, signer);

        state.delete(&PERMISSION_CONTRACT_ADDRESS, &row).unwrap();
        assert!(matches!(
            gate.verify_permission(&tx, &state),
            Err(ChainError::UnapprovedIdentity(_))
        ));
    }

    #[test]
    fn test_bad_signature_rejected_even_when_disabled() {
        let suite = crypto_suite(SuiteKind::Standard);
        let config = ChainConfig {
            enable_permission: false,
            ..ChainConfig::default()
        };
        let gate = AuthorizationGate::new(suite, &config);
        let tx = Transaction::transfer(0, addr(5), 1);
        assert!(matches!(
            gate.verify_permission(&tx, &MemoryState::new()),
            Err(ChainError::InvalidSignature(_))
        ));
    }
}
