//! Capabilities and scopes.
//!
//! Capabilities come in two tiers:
//!
//! - **Action** capabilities gate ordinary transactions (`SendTx`,
//!   `CreateContract`, `AccessContract`).
//! - **Modify** capabilities gate changes to the permission system itself.
//!   Most come in `Add`/`Del` pairs; `CreateGroup` and `DelGroup` stand alone.
//!
//! Every capability is evaluated in exactly one [`Scope`]: chain-wide, a
//! group, or a contract.

use std::fmt;

use serde::{Deserialize, Serialize};

use permchain_core::Address;

use crate::roles::Roles;

/// A capability kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum Capability {
    // ─────────────────────────────────────────────────────────────────────────
    // Action tier
    // ─────────────────────────────────────────────────────────────────────────
    SendTx = 1,
    CreateContract = 2,
    AccessContract = 3,

    // ─────────────────────────────────────────────────────────────────────────
    // Modify tier
    // ─────────────────────────────────────────────────────────────────────────
    AddSendTxPerm = 10,
    DelSendTxPerm = 11,
    AddSendTxManagerPerm = 12,
    DelSendTxManagerPerm = 13,
    AddCrtContractPerm = 14,
    DelCrtContractPerm = 15,
    AddCrtContractManagerPerm = 16,
    DelCrtContractManagerPerm = 17,
    AddGroupMemberPerm = 18,
    DelGroupMemberPerm = 19,
    AddGroupManagerPerm = 20,
    DelGroupManagerPerm = 21,
    AddContractMemberPerm = 22,
    DelContractMemberPerm = 23,
    AddContractManagerPerm = 24,
    DelContractManagerPerm = 25,
    AddWhitelistPerm = 26,
    DelWhitelistPerm = 27,
    AddBlacklistPerm = 28,
    DelBlacklistPerm = 29,
    AddCertPerm = 30,
    DelCertPerm = 31,
    CreateGroup = 32,
    DelGroup = 33,
}

/// Which kind of scope a capability is granted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Group,
    Contract,
}

impl Capability {
    /// All capabilities, in code order.
    pub const ALL: [Capability; 27] = [
        Capability::SendTx,
        Capability::CreateContract,
        Capability::AccessContract,
        Capability::AddSendTxPerm,
        Capability::DelSendTxPerm,
        Capability::AddSendTxManagerPerm,
        Capability::DelSendTxManagerPerm,
        Capability::AddCrtContractPerm,
        Capability::DelCrtContractPerm,
        Capability::AddCrtContractManagerPerm,
        Capability::DelCrtContractManagerPerm,
        Capability::AddGroupMemberPerm,
        Capability::DelGroupMemberPerm,
        Capability::AddGroupManagerPerm,
        Capability::DelGroupManagerPerm,
        Capability::AddContractMemberPerm,
        Capability::DelContractMemberPerm,
        Capability::AddContractManagerPerm,
        Capability::DelContractManagerPerm,
        Capability::AddWhitelistPerm,
        Capability::DelWhitelistPerm,
        Capability::AddBlacklistPerm,
        Capability::DelBlacklistPerm,
        Capability::AddCertPerm,
        Capability::DelCertPerm,
        Capability::CreateGroup,
        Capability::DelGroup,
    ];

    /// Numeric code, as carried in permission calls.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Parse a numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Whether this gates an ordinary transaction.
    pub fn is_action(self) -> bool {
        matches!(
            self,
            Capability::SendTx | Capability::CreateContract | Capability::AccessContract
        )
    }

    /// Whether this is an `Add*` capability.
    pub fn is_add(self) -> bool {
        !self.is_action() && self.code() <= 30 && self.code() % 2 == 0
    }

    /// Whether this is a `Del*` capability.
    pub fn is_del(self) -> bool {
        !self.is_action() && self.code() <= 31 && self.code() % 2 == 1
    }

    /// The scope kind rows for this capability live in.
    ///
    /// `SendTx` is also answered in group scope; see
    /// `PermissionTable::check_action_perm`.
    pub fn scope_kind(self) -> ScopeKind {
        use Capability::*;
        match self {
            AccessContract | AddContractMemberPerm | DelContractMemberPerm
            | AddContractManagerPerm | DelContractManagerPerm => ScopeKind::Contract,
            AddGroupMemberPerm | DelGroupMemberPerm | AddGroupManagerPerm
            | DelGroupManagerPerm | DelGroup => ScopeKind::Group,
            _ => ScopeKind::Global,
        }
    }

    /// The role an `Add*`/`Del*` capability sets or clears on its target.
    ///
    /// `None` for capabilities that do not map to a table role (action
    /// kinds, certificate kinds, group creation and deletion).
    pub fn target_role(self) -> Option<Roles> {
        use Capability::*;
        let role = match self {
            AddSendTxPerm | DelSendTxPerm => Roles::SEND_TX,
            AddSendTxManagerPerm | DelSendTxManagerPerm => Roles::SEND_TX_MANAGER,
            AddCrtContractPerm | DelCrtContractPerm => Roles::CREATE_CONTRACT,
            AddCrtContractManagerPerm | DelCrtContractManagerPerm => {
                Roles::CREATE_CONTRACT_MANAGER
            }
            AddGroupMemberPerm | DelGroupMemberPerm => Roles::MEMBER,
            AddGroupManagerPerm | DelGroupManagerPerm => Roles::MANAGER,
            AddContractMemberPerm | DelContractMemberPerm => Roles::MEMBER,
            AddContractManagerPerm | DelContractManagerPerm => Roles::MANAGER,
            AddWhitelistPerm | DelWhitelistPerm => Roles::WHITELISTED,
            AddBlacklistPerm | DelBlacklistPerm => Roles::BLOCKED,
            _ => return None,
        };
        Some(role)
    }

    /// Name as used in logs and errors.
    pub fn name(self) -> &'static str {
        use Capability::*;
        match self {
            SendTx => "SendTx",
            CreateContract => "CreateContract",
            AccessContract => "AccessContract",
            AddSendTxPerm => "AddSendTxPerm",
            DelSendTxPerm => "DelSendTxPerm",
            AddSendTxManagerPerm => "AddSendTxManagerPerm",
            DelSendTxManagerPerm => "DelSendTxManagerPerm",
            AddCrtContractPerm => "AddCrtContractPerm",
            DelCrtContractPerm => "DelCrtContractPerm",
            AddCrtContractManagerPerm => "AddCrtContractManagerPerm",
            DelCrtContractManagerPerm => "DelCrtContractManagerPerm",
            AddGroupMemberPerm => "AddGroupMemberPerm",
            DelGroupMemberPerm => "DelGroupMemberPerm",
            AddGroupManagerPerm => "AddGroupManagerPerm",
            DelGroupManagerPerm => "DelGroupManagerPerm",
            AddContractMemberPerm => "AddContractMemberPerm",
            DelContractMemberPerm => "DelContractMemberPerm",
            AddContractManagerPerm => "AddContractManagerPerm",
            DelContractManagerPerm => "DelContractManagerPerm",
            AddWhitelistPerm => "AddWhitelistPerm",
            DelWhitelistPerm => "DelWhitelistPerm",
            AddBlacklistPerm => "AddBlacklistPerm",
            DelBlacklistPerm => "DelBlacklistPerm",
            AddCertPerm => "AddCertPerm",
            DelCertPerm => "DelCertPerm",
            CreateGroup => "CreateGroup",
            DelGroup => "DelGroup",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a permission row applies.
///
/// Ordered `Global < Group < Contract` so a subject's rows sort together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Group(Address),
    Contract(Address),
}

impl Scope {
    /// Build the scope a check with these address fields is answered in.
    ///
    /// `None` when both fields are set.
    pub fn from_fields(group: &Address, contract: &Address) -> Option<Self> {
        match (group.is_zero(), contract.is_zero()) {
            (true, true) => Some(Scope::Global),
            (false, true) => Some(Scope::Group(*group)),
            (true, false) => Some(Scope::Contract(*contract)),
            (false, false) => None,
        }
    }

    /// The kind of this scope.
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Global => ScopeKind::Global,
            Scope::Group(_) => ScopeKind::Group,
            Scope::Contract(_) => ScopeKind::Contract,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Group(addr) => write!(f, "group {}", addr),
            Scope::Contract(addr) => write!(f, "contract {}", addr),
        }
    }
}
