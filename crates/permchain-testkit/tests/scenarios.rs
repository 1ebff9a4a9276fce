//! End-to-end admission scenarios.
//!
//! Each test drives a [`TestChain`] through signed transactions only, the
//! way the pool and the block builder see them.

use permchain::cim::{is_approved_in, CimError};
use permchain::perms::{PermissionTable, PermsError, Roles};
use permchain::store::{SqliteState, StateDb};
use permchain::{
    Applied, Capability, Chain, ChainConfig, ChainError, Effect, Genesis, PermissionCall, Scope,
    SuiteKind, Transaction, TxKind,
};
use permchain_core::{Address, CryptoSuite};
use permchain_testkit::{Identity, TestChain};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn global_grant(member: Address, capability: Capability) -> PermissionCall {
    PermissionCall::Grant {
        contract: Address::ZERO,
        member,
        group: Address::ZERO,
        capability,
    }
}

fn global_revoke(member: Address, capability: Capability) -> PermissionCall {
    PermissionCall::Revoke {
        contract: Address::ZERO,
        member,
        group: Address::ZERO,
        capability,
    }
}

fn assert_denied(
    result: permchain::Result<impl std::fmt::Debug>,
    capability: Capability,
    scope: Scope,
) {
    match result {
        Err(ChainError::PermissionDenied {
            capability: got_capability,
            scope: got_scope,
            ..
        }) => {
            assert_eq!(got_capability, capability);
            assert_eq!(got_scope, scope);
        }
        other => panic!("expected {capability} to be denied in {scope:?}, got {other:?}"),
    }
}

fn table(chain: &TestChain) -> PermissionTable {
    PermissionTable::load(&chain.state).unwrap()
}

#[test]
fn test_outsider_is_unapproved() {
    init_tracing();
    let mut chain = TestChain::new(4, 1);
    chain.height = 10;
    let outsider = Identity::certified();
    let to = chain.users[0].address;

    let tx = chain.transfer(&outsider, to);
    match chain.apply(&tx) {
        Err(ChainError::UnapprovedIdentity(address)) => assert_eq!(address, outsider.address),
        other => panic!("expected an unapproved identity, got {other:?}"),
    }
    assert_eq!(chain.height, 11);
}

#[test]
fn test_certified_user_needs_send_permission() {
    init_tracing();
    let mut chain = TestChain::new(4, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();

    let tx = chain.transfer(&user, admin.address);
    assert_denied(chain.admit(&tx), Capability::SendTx, Scope::Global);

    let applied = chain.execute(&admin, global_grant(user.address, Capability::AddSendTxPerm));
    assert_eq!(
        applied,
        Applied::Permission(Effect::Granted {
            member: user.address,
            capability: Capability::AddSendTxPerm,
            scope: Scope::Global,
        })
    );

    let admission = chain.admit(&tx).unwrap();
    assert_eq!(admission.signer, user.address);
    assert_eq!(admission.kind, TxKind::Transfer);
}

#[test]
fn test_committee_members_can_send_and_create() {
    let mut chain = TestChain::new(4, 0);
    for i in 0..4 {
        let member = chain.committee[i].clone();
        let to = chain.committee[(i + 1) % 4].address;
        let tx = chain.transfer(&member, to);
        assert!(chain.admit(&tx).is_ok());
        let tx = chain.create_contract(&member);
        assert!(chain.admit(&tx).is_ok());
    }
}

#[test]
fn test_added_certificate_approves_identity() {
    init_tracing();
    let mut chain = TestChain::new(4, 0);
    let admin = chain.committee[0].clone();
    let outsider = Identity::certified();

    let tx = chain.transfer(&outsider, admin.address);
    assert!(matches!(chain.admit(&tx), Err(ChainError::UnapprovedIdentity(_))));

    let applied = chain.execute(
        &admin,
        PermissionCall::AddCertificate {
            certificate: outsider.certificate_bytes(),
        },
    );
    assert_eq!(applied, Applied::Permission(Effect::CertificateAdded(outsider.address)));

    // approved now, but still without any role
    assert_denied(chain.admit(&tx), Capability::SendTx, Scope::Global);
}

#[test]
fn test_ordinary_user_cannot_add_certificates() {
    let mut chain = TestChain::new(1, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();
    chain.execute(&admin, global_grant(user.address, Capability::AddSendTxPerm));

    let outsider = Identity::certified();
    let call = PermissionCall::AddCertificate {
        certificate: outsider.certificate_bytes(),
    };
    let tx = chain.permission_call(&user, &call);
    assert_denied(chain.apply(&tx), Capability::AddCertPerm, Scope::Global);

    let to = admin.address;
    let attempt = chain.transfer(&outsider, to);
    assert!(matches!(chain.admit(&attempt), Err(ChainError::UnapprovedIdentity(_))));
}

#[test]
fn test_removed_certificate_revokes_approval() {
    let mut chain = TestChain::new(4, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();
    chain.execute(&admin, global_grant(user.address, Capability::AddSendTxPerm));

    let tx = chain.transfer(&user, admin.address);
    assert!(chain.admit(&tx).is_ok());

    let applied = chain.execute(
        &admin,
        PermissionCall::RemoveCertificate {
            holder: user.address,
        },
    );
    assert_eq!(applied, Applied::Permission(Effect::CertificateRemoved(user.address)));

    match chain.admit(&tx) {
        Err(ChainError::UnapprovedIdentity(address)) => assert_eq!(address, user.address),
        other => panic!("expected an unapproved identity, got {other:?}"),
    }
    // roles survive; only the certificate went away
    assert!(table(&chain).check_action_perm(
        &user.address,
        &Address::ZERO,
        &Address::ZERO,
        Capability::SendTx
    ));
}

#[test]
fn test_contract_access_is_scoped() {
    init_tracing();
    let mut chain = TestChain::new(4, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();

    let c = chain.deploy(&admin);
    let d = chain.deploy(&admin);
    assert_ne!(c, d);

    chain.execute(
        &admin,
        PermissionCall::Grant {
            contract: c,
            member: user.address,
            group: Address::ZERO,
            capability: Capability::AddContractMemberPerm,
        },
    );

    let call_c = chain.call_contract(&user, c);
    let admission = chain.admit(&call_c).unwrap();
    assert_eq!(admission.kind, TxKind::ContractCall(c));

    let call_d = chain.call_contract(&user, d);
    assert_denied(chain.admit(&call_d), Capability::AccessContract, Scope::Contract(d));

    let create = chain.create_contract(&user);
    assert_denied(chain.admit(&create), Capability::CreateContract, Scope::Global);
}

#[test]
fn test_contract_manager_is_the_creator() {
    let mut chain = TestChain::new(2, 1);
    let creator = chain.committee[0].clone();
    let other = chain.committee[1].clone();
    let user = chain.users[0].clone();
    let contract = chain.deploy(&creator);

    let call = PermissionCall::Grant {
        contract,
        member: user.address,
        group: Address::ZERO,
        capability: Capability::AddContractMemberPerm,
    };
    // another committee member does not manage this contract
    let tx = chain.permission_call(&other, &call);
    assert_denied(
        chain.apply(&tx),
        Capability::AddContractMemberPerm,
        Scope::Contract(contract),
    );

    let info = table(&chain).contract(&contract).cloned().unwrap();
    assert_eq!(info.creator, creator.address);
}

#[test]
fn test_group_lifecycle() {
    init_tracing();
    let mut chain = TestChain::new(4, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();

    let group = match chain.execute(&admin, PermissionCall::CreateGroup { name: "ops".into() }) {
        Applied::Permission(Effect::GroupCreated(group)) => group,
        other => panic!("expected a group, got {other:?}"),
    };
    assert_eq!(
        group,
        chain.chain.permission_contract().group_address(&admin.address, "ops")
    );

    chain.execute(
        &admin,
        PermissionCall::Grant {
            contract: Address::ZERO,
            member: user.address,
            group,
            capability: Capability::AddGroupMemberPerm,
        },
    );

    let to_group = chain.transfer(&user, group);
    assert_eq!(chain.admit(&to_group).unwrap().kind, TxKind::GroupTransfer(group));

    let to_admin = chain.transfer(&user, admin.address);
    assert_denied(chain.admit(&to_admin), Capability::SendTx, Scope::Global);

    // members inherit what the group holds globally
    chain.execute(&admin, global_grant(group, Capability::AddSendTxPerm));
    assert!(chain.admit(&to_admin).is_ok());

    chain.execute(&admin, PermissionCall::DeleteGroup { group });

    let table = table(&chain);
    assert!(!table.is_group(&group));
    assert!(table.roles_of(&user.address, &Scope::Group(group)).is_empty());
    assert!(table.roles_of(&group, &Scope::Global).is_empty());
    assert!(!table.check_action_perm(&user.address, &group, &Address::ZERO, Capability::SendTx));

    assert_denied(chain.admit(&to_admin), Capability::SendTx, Scope::Global);
    // the old group address is an ordinary account again
    assert_denied(chain.admit(&to_group), Capability::SendTx, Scope::Global);
}

#[test]
fn test_grant_and_revoke_are_idempotent() {
    let mut chain = TestChain::new(1, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();

    chain.execute(&admin, global_grant(user.address, Capability::AddSendTxPerm));
    let once = table(&chain);
    chain.execute(&admin, global_grant(user.address, Capability::AddSendTxPerm));
    assert_eq!(table(&chain), once);
    assert_eq!(once.roles_of(&user.address, &Scope::Global), Roles::SEND_TX);

    chain.execute(&admin, global_revoke(user.address, Capability::DelSendTxPerm));
    let revoked = table(&chain);
    chain.execute(&admin, global_revoke(user.address, Capability::DelSendTxPerm));
    assert_eq!(table(&chain), revoked);
    assert!(revoked.roles_of(&user.address, &Scope::Global).is_empty());
}

#[test]
fn test_blacklist_overrides_roles() {
    let mut chain = TestChain::new(2, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();
    chain.execute(&admin, global_grant(user.address, Capability::AddSendTxPerm));

    let tx = chain.transfer(&user, admin.address);
    assert!(chain.admit(&tx).is_ok());

    chain.execute(&admin, global_grant(user.address, Capability::AddBlacklistPerm));
    assert_denied(chain.admit(&tx), Capability::SendTx, Scope::Global);

    chain.execute(&admin, global_revoke(user.address, Capability::DelBlacklistPerm));
    assert!(chain.admit(&tx).is_ok());
}

#[test]
fn test_whitelisted_subject_can_send() {
    let mut chain = TestChain::new(1, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();

    chain.execute(&admin, global_grant(user.address, Capability::AddWhitelistPerm));
    let tx = chain.transfer(&user, admin.address);
    assert!(chain.admit(&tx).is_ok());

    let create = chain.create_contract(&user);
    assert_denied(chain.admit(&create), Capability::CreateContract, Scope::Global);
}

#[test]
fn test_pool_and_block_agree() {
    let mut chain = TestChain::new(2, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();
    let outsider = Identity::certified();
    let contract = chain.deploy(&admin);

    let garbage = Transaction::call(0, permchain::PERMISSION_CONTRACT_ADDRESS, vec![0xde, 0xad]);
    let garbage = chain.sign(&admin, garbage);
    let txs = vec![
        chain.transfer(&admin, user.address),
        chain.transfer(&user, admin.address),
        chain.transfer(&outsider, admin.address),
        chain.create_contract(&user),
        chain.call_contract(&admin, contract),
        chain.call_contract(&user, contract),
        chain.permission_call(&user, &global_grant(user.address, Capability::AddSendTxPerm)),
        garbage,
    ];

    for tx in &txs {
        let pending = chain.chain.admit_pending(tx, &chain.state);
        let block = chain.chain.admit_to_block(tx, &chain.state);
        match (pending, block) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
            (a, b) => panic!("pool said {a:?}, block said {b:?}"),
        }
    }
}

#[test]
fn test_duplicate_group_is_rejected() {
    let mut chain = TestChain::new(1, 0);
    let admin = chain.committee[0].clone();
    chain.execute(&admin, PermissionCall::CreateGroup { name: "ops".into() });
    let before = table(&chain);

    let again = chain.permission_call(&admin, &PermissionCall::CreateGroup { name: "ops".into() });
    assert!(chain.admit(&again).is_ok());
    let err = chain.apply(&again).unwrap_err();
    assert!(matches!(err, ChainError::Perms(PermsError::GroupExists(_))), "{err:?}");
    assert!(err.is_rejection());
    assert_eq!(table(&chain), before);
}

#[test]
fn test_removing_unknown_holder_is_rejected() {
    let mut chain = TestChain::new(1, 0);
    let admin = chain.committee[0].clone();
    let stranger = Identity::uncertified(SuiteKind::Standard);

    let call = PermissionCall::RemoveCertificate {
        holder: stranger.address,
    };
    let tx = chain.permission_call(&admin, &call);
    match chain.apply(&tx) {
        Err(err @ ChainError::Cim(CimError::UnknownIdentity(_))) => assert!(err.is_rejection()),
        other => panic!("expected an unknown identity, got {other:?}"),
    }
    assert!(is_approved_in(&chain.state, &admin.address).unwrap());
}

#[test]
fn test_unparseable_certificate_is_rejected() {
    let mut chain = TestChain::new(1, 0);
    let admin = chain.committee[0].clone();

    let call = PermissionCall::AddCertificate {
        certificate: vec![1, 2, 3],
    };
    let tx = chain.permission_call(&admin, &call);
    match chain.apply(&tx) {
        Err(err @ ChainError::Cim(CimError::InvalidCertificate(_))) => assert!(err.is_rejection()),
        other => panic!("expected an invalid certificate, got {other:?}"),
    }

    // the chain keeps going
    let to = Address::from_bytes([9; 20]);
    let next = chain.transfer(&admin, to);
    assert!(chain.apply(&next).is_ok());
}

#[test]
fn test_adding_known_certificate_is_rejected() {
    let mut chain = TestChain::new(1, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();

    let call = PermissionCall::AddCertificate {
        certificate: user.certificate_bytes(),
    };
    let tx = chain.permission_call(&admin, &call);
    let err = chain.apply(&tx).unwrap_err();
    assert!(matches!(err, ChainError::Cim(CimError::DuplicateIdentity(_))), "{err:?}");
    assert!(err.is_rejection());
}

#[test]
fn test_uncertified_committee_member_fails_genesis() {
    let certified = Identity::certified();
    let uncertified = Identity::uncertified(SuiteKind::Standard);
    let chain = Chain::new(Genesis {
        config: ChainConfig::default(),
        committee: vec![certified.committee_member(), uncertified.committee_member()],
        certificates: vec![certified.certificate_bytes()],
    });

    let state = permchain::store::MemoryState::new();
    match chain.commit_genesis(&state, 0) {
        Err(ChainError::Cim(CimError::UncertifiedCommitteeMember { index, address })) => {
            assert_eq!(index, 1);
            assert_eq!(address, uncertified.address);
        }
        other => panic!("expected genesis to fail, got {other:?}"),
    }
    assert!(PermissionTable::load(&state).unwrap().is_empty());
    assert!(!is_approved_in(&state, &certified.address).unwrap());
}

#[test]
fn test_genesis_is_one_shot() {
    let chain = TestChain::new(2, 0);
    match chain.chain.commit_genesis(&chain.state, 5) {
        Err(ChainError::Cim(CimError::AlreadyInitialized { block })) => assert_eq!(block, 0),
        other => panic!("expected a second genesis to fail, got {other:?}"),
    }
}

#[test]
fn test_malformed_permission_call_is_rejected() {
    let mut chain = TestChain::new(1, 0);
    let admin = chain.committee[0].clone();

    let garbage = Transaction::call(0, permchain::PERMISSION_CONTRACT_ADDRESS, vec![1, 2, 3]);
    let garbage = chain.sign(&admin, garbage);
    let err = chain.admit(&garbage).unwrap_err();
    assert!(matches!(err, ChainError::MalformedCall(_)));
    assert!(err.is_rejection());

    // an add call carrying a del capability
    let backwards = global_grant(admin.address, Capability::DelSendTxPerm);
    let tx = chain.permission_call(&admin, &backwards);
    assert!(matches!(chain.admit(&tx), Err(ChainError::MalformedCall(_))));
}

#[test]
fn test_tampered_transaction_recovers_another_signer() {
    let mut chain = TestChain::new(1, 1);
    let admin = chain.committee[0].clone();
    let user = chain.users[0].clone();

    let mut tx = chain.transfer(&admin, user.address);
    tx.value += 1;
    match chain.admit(&tx) {
        Err(ChainError::UnapprovedIdentity(address)) => assert_ne!(address, admin.address),
        Err(ChainError::InvalidSignature(_)) => {}
        other => panic!("expected tampering to be caught, got {other:?}"),
    }
}

#[test]
fn test_sqlite_state_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    let admin = Identity::certified();
    let user = Identity::certified();
    let chain = Chain::new(Genesis {
        config: ChainConfig::default(),
        committee: vec![admin.committee_member()],
        certificates: vec![admin.certificate_bytes(), user.certificate_bytes()],
    });
    let suite = chain.suite().clone();

    let sign = |from: &Identity, mut tx: Transaction| {
        chain.tx_signer().sign(suite.as_ref(), &mut tx, &from.key).unwrap();
        tx
    };
    let transfer = sign(&user, Transaction::transfer(7, admin.address, 1));

    {
        let state = SqliteState::open(&path).unwrap();
        chain.commit_genesis(&state, 0).unwrap();
        assert_denied(chain.admit_pending(&transfer, &state), Capability::SendTx, Scope::Global);

        let data = global_grant(user.address, Capability::AddSendTxPerm).encode().unwrap();
        let grant = sign(&admin, Transaction::call(0, permchain::PERMISSION_CONTRACT_ADDRESS, data));
        chain.apply_transaction(&grant, 1, &state).unwrap();
    }

    let state = SqliteState::open(&path).unwrap();
    assert!(state
        .contains(&permchain::PERMISSION_CONTRACT_ADDRESS, permchain::cim::INITIALIZED_KEY)
        .unwrap());
    assert!(chain.admit_pending(&transfer, &state).is_ok());
    assert!(matches!(
        chain.commit_genesis(&state, 2),
        Err(ChainError::Cim(CimError::AlreadyInitialized { block: 0 }))
    ));
}

#[test]
fn test_national_chain_without_enforcement() {
    let config = ChainConfig {
        suite: SuiteKind::National,
        enable_permission: false,
        ..ChainConfig::default()
    };
    let mut chain = TestChain::with_config(config, 0, 0);
    assert_eq!(chain.suite().kind(), SuiteKind::National);

    let anyone = Identity::uncertified(SuiteKind::National);
    let tx = chain.transfer(&anyone, Address::from_bytes([9; 20]));
    let admission = chain.admit(&tx).unwrap();
    assert_eq!(admission.signer, anyone.address);
    assert_eq!(admission.requirement, None);

    let create = chain.create_contract(&anyone);
    let outcome = chain.apply(&create).unwrap();
    assert_eq!(outcome.signer, anyone.address);
    assert!(matches!(outcome.applied, Applied::ContractCreated(_)));

    // admitted, but the permission contract still checks its caller
    let call = chain.permission_call(&anyone, &PermissionCall::CreateGroup { name: "x".into() });
    assert!(chain.admit(&call).is_ok());
    assert_denied(chain.apply(&call), Capability::CreateGroup, Scope::Global);
}
