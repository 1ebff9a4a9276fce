//! Error types for the permissions module.

use thiserror::Error;

use permchain_core::Address;

use crate::capability::Capability;

/// Structural errors from permission table mutations.
///
/// Authorization failures are not errors here: `check_action_perm` answers
/// `false`, and callers turn that into their own rejection.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The group does not exist.
    #[error("unknown group {0}")]
    UnknownGroup(Address),

    /// A group already exists at this address.
    #[error("group {0} already exists")]
    GroupExists(Address),

    /// The contract is not registered.
    #[error("unknown contract {0}")]
    UnknownContract(Address),

    /// The contract is already registered.
    #[error("contract {0} already registered")]
    ContractExists(Address),

    /// Only `Add*` capabilities can be granted.
    #[error("{0} cannot be granted")]
    NotGrantable(Capability),

    /// Only `Del*` capabilities can be revoked.
    #[error("{0} cannot be revoked")]
    NotRevocable(Capability),

    /// The group/contract fields do not match the capability's scope.
    #[error("{capability} is not valid in this scope: {reason}")]
    WrongScope {
        capability: Capability,
        reason: &'static str,
    },

    /// Store error while loading or saving the table.
    #[error("store error: {0}")]
    Store(#[from] permchain_store::StoreError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
