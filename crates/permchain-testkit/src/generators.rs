//! Proptest generators for property-based testing.

use proptest::prelude::*;

use permchain::PermissionCall;
use permchain_core::{crypto_suite, Address, KeyCodec, PrivateKey, SuiteKind, H256};
use permchain_perms::Capability;

/// Either suite.
pub fn suite_kind() -> impl Strategy<Value = SuiteKind> {
    prop_oneof![Just(SuiteKind::National), Just(SuiteKind::Standard)]
}

/// A valid private key under `kind`.
pub fn private_key(kind: SuiteKind) -> impl Strategy<Value = PrivateKey> {
    any::<[u8; 32]>().prop_filter_map("scalar out of range", move |bytes| {
        crypto_suite(kind).deserialize_private(&bytes).ok()
    })
}

/// A suite together with a key under it.
pub fn suite_and_key() -> impl Strategy<Value = (SuiteKind, PrivateKey)> {
    suite_kind().prop_flat_map(|kind| (Just(kind), private_key(kind)))
}

/// A random 32-byte digest.
pub fn digest() -> impl Strategy<Value = H256> {
    any::<[u8; 32]>().prop_map(H256)
}

/// A random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// A non-empty message up to `max_len` bytes.
pub fn message(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len)
}

/// Any capability.
pub fn capability() -> impl Strategy<Value = Capability> {
    prop::sample::select(Capability::ALL.to_vec())
}

/// Any permission call, valid or not as far as its requirement goes.
pub fn permission_call() -> impl Strategy<Value = PermissionCall> {
    prop_oneof![
        (address(), address(), address(), capability()).prop_map(
            |(contract, member, group, capability)| PermissionCall::Grant {
                contract,
                member,
                group,
                capability,
            }
        ),
        (address(), address(), address(), capability()).prop_map(
            |(contract, member, group, capability)| PermissionCall::Revoke {
                contract,
                member,
                group,
                capability,
            }
        ),
        "[a-z][a-z0-9-]{0,15}".prop_map(|name| PermissionCall::CreateGroup { name }),
        address().prop_map(|group| PermissionCall::DeleteGroup { group }),
        prop::collection::vec(any::<u8>(), 0..64)
            .prop_map(|certificate| PermissionCall::AddCertificate { certificate }),
        address().prop_map(|holder| PermissionCall::RemoveCertificate { holder }),
    ]
}
