//! The permission table.
//!
//! Rows are keyed by `(subject, scope)` and hold a [`Roles`] bitset. Groups
//! and contracts have their own records so a scope can be checked for
//! existence before its rows are consulted.
//!
//! The table is a read-mostly view over chain state: [`PermissionTable::load`]
//! builds it from a [`StateDb`], mutations change the in-memory copy, and
//! [`PermissionTable::save`] writes it back. Mutations do not re-check
//! authorization. Callers obtain an [`Authorization`] from
//! [`PermissionTable::authorize`] first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use permchain_core::{Address, PERMISSION_CONTRACT_ADDRESS};
use permchain_store::{StateDb, StateDbExt};

use crate::capability::{Capability, Scope, ScopeKind};
use crate::error::{PermsError, Result};
use crate::roles::Roles;

/// State key the table is persisted under, in the permission contract account.
pub const TABLE_KEY: &[u8] = b"permission-table/v1";

/// Roles every committee member starts with.
pub const COMMITTEE_ROLES: Roles = Roles::from_bits_truncate(
    Roles::SEND_TX_MANAGER.bits() | Roles::CREATE_CONTRACT_MANAGER.bits() | Roles::ROOT.bits(),
);

/// Global roles a group passes on to its members.
const INHERITABLE: Roles =
    Roles::from_bits_truncate(Roles::SEND_TX.bits() | Roles::CREATE_CONTRACT.bits());

/// A named group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub creator: Address,
    /// Block number the group was created at.
    pub created_at: u64,
}

/// A registered contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub creator: Address,
    /// Block number the contract was created at.
    pub created_at: u64,
}

/// Proof that `check_action_perm` passed for a request.
///
/// Only [`PermissionTable::authorize`] can build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    subject: Address,
    group: Address,
    contract: Address,
    capability: Capability,
}

impl Authorization {
    /// Who was authorized.
    pub fn subject(&self) -> &Address {
        &self.subject
    }

    /// The group field of the checked request.
    pub fn group(&self) -> &Address {
        &self.group
    }

    /// The contract field of the checked request.
    pub fn contract(&self) -> &Address {
        &self.contract
    }

    /// The capability that was checked.
    pub fn capability(&self) -> Capability {
        self.capability
    }
}

/// The permission table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    entries: BTreeMap<(Address, Scope), Roles>,
    groups: BTreeMap<Address, Group>,
    contracts: BTreeMap<Address, ContractInfo>,
}

/// Persisted form of the table.
#[derive(Serialize, Deserialize)]
struct TableRecord {
    entries: Vec<(Address, Scope, Roles)>,
    groups: Vec<(Address, Group)>,
    contracts: Vec<(Address, ContractInfo)>,
}

impl PermissionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table a chain starts with: every committee member holds
    /// [`COMMITTEE_ROLES`] globally.
    pub fn genesis<'a>(committee: impl IntoIterator<Item = &'a Address>) -> Self {
        let mut table = Self::new();
        for member in committee {
            table.entry(*member, Scope::Global).insert(COMMITTEE_ROLES);
        }
        table
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the table from state. A chain with no table yields an empty one.
    pub fn load<S: StateDb + ?Sized>(state: &S) -> Result<Self> {
        let record: Option<TableRecord> = state.get_cbor(&PERMISSION_CONTRACT_ADDRESS, TABLE_KEY)?;
        let Some(record) = record else {
            return Ok(Self::new());
        };

        Ok(Self {
            entries: record
                .entries
                .into_iter()
                .map(|(subject, scope, roles)| ((subject, scope), roles))
                .filter(|(_, roles)| !roles.is_empty())
                .collect(),
            groups: record.groups.into_iter().collect(),
            contracts: record.contracts.into_iter().collect(),
        })
    }

    /// Write the table to state.
    pub fn save<S: StateDb + ?Sized>(&self, state: &S) -> Result<()> {
        let record = TableRecord {
            entries: self
                .entries
                .iter()
                .map(|((subject, scope), roles)| (*subject, *scope, *roles))
                .collect(),
            groups: self.groups.iter().map(|(a, g)| (*a, g.clone())).collect(),
            contracts: self.contracts.iter().map(|(a, c)| (*a, c.clone())).collect(),
        };
        state.set_cbor(&PERMISSION_CONTRACT_ADDRESS, TABLE_KEY, &record)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `subject` holds `capability`.
    ///
    /// The scope is picked by which address fields are non-zero: `group`
    /// consults the group's rows, `contract` the contract's rows, neither
    /// the subject's global rows (plus what its groups pass on). Setting both
    /// is a caller error and answers `false`. A blacklisted subject holds
    /// nothing.
    pub fn check_action_perm(
        &self,
        subject: &Address,
        group: &Address,
        contract: &Address,
        capability: Capability,
    ) -> bool {
        if self.is_blocked(subject) {
            return false;
        }

        match Scope::from_fields(group, contract) {
            Some(Scope::Global) => self.check_global(subject, capability),
            Some(Scope::Group(group)) => self.check_group(subject, &group, capability),
            Some(Scope::Contract(contract)) => self.check_contract(subject, &contract, capability),
            None => {
                tracing::warn!(
                    %subject,
                    %group,
                    %contract,
                    %capability,
                    "permission check with both group and contract scope"
                );
                false
            }
        }
    }

    /// Run [`Self::check_action_perm`] and mint an [`Authorization`] if it passes.
    pub fn authorize(
        &self,
        subject: &Address,
        group: &Address,
        contract: &Address,
        capability: Capability,
    ) -> Option<Authorization> {
        self.check_action_perm(subject, group, contract, capability)
            .then(|| Authorization {
                subject: *subject,
                group: *group,
                contract: *contract,
                capability,
            })
    }

    fn check_global(&self, subject: &Address, capability: Capability) -> bool {
        use Capability::*;
        let roles = self.effective_global_roles(subject);
        let can_send = roles.intersects(Roles::SEND_TX | Roles::SEND_TX_MANAGER | Roles::WHITELISTED);

        match capability {
            SendTx | CreateGroup => can_send,
            AddSendTxPerm | DelSendTxPerm | AddSendTxManagerPerm | DelSendTxManagerPerm => {
                roles.contains(Roles::SEND_TX_MANAGER)
            }
            CreateContract => roles.intersects(Roles::CREATE_CONTRACT | Roles::CREATE_CONTRACT_MANAGER),
            AddCrtContractPerm
            | DelCrtContractPerm
            | AddCrtContractManagerPerm
            | DelCrtContractManagerPerm => roles.contains(Roles::CREATE_CONTRACT_MANAGER),
            AddWhitelistPerm | DelWhitelistPerm | AddBlacklistPerm | DelBlacklistPerm
            | AddCertPerm | DelCertPerm => roles.contains(Roles::ROOT),
            _ => false,
        }
    }

    fn check_group(&self, subject: &Address, group: &Address, capability: Capability) -> bool {
        use Capability::*;
        if !self.groups.contains_key(group) {
            return false;
        }
        let roles = self.roles_of(subject, &Scope::Group(*group));

        match capability {
            SendTx => roles.intersects(Roles::MEMBER | Roles::MANAGER),
            AddGroupMemberPerm | DelGroupMemberPerm | AddGroupManagerPerm
            | DelGroupManagerPerm | DelGroup => roles.contains(Roles::MANAGER),
            _ => false,
        }
    }

    fn check_contract(&self, subject: &Address, contract: &Address, capability: Capability) -> bool {
        use Capability::*;
        if !self.contracts.contains_key(contract) {
            return false;
        }
        let roles = self.roles_of(subject, &Scope::Contract(*contract));

        match capability {
            AccessContract => roles.intersects(Roles::MEMBER | Roles::MANAGER),
            AddContractMemberPerm
            | DelContractMemberPerm
            | AddContractManagerPerm
            | DelContractManagerPerm => roles.contains(Roles::MANAGER),
            _ => false,
        }
    }

    /// The subject's own global roles plus the inheritable global roles of
    /// every group it belongs to.
    fn effective_global_roles(&self, subject: &Address) -> Roles {
        let mut roles = self.roles_of(subject, &Scope::Global);
        for ((_, scope), member_roles) in self.subject_rows(subject) {
            if let Scope::Group(group) = scope {
                if self.groups.contains_key(group)
                    && member_roles.intersects(Roles::MEMBER | Roles::MANAGER)
                {
                    roles |= self.roles_of(group, &Scope::Global).intersection(INHERITABLE);
                }
            }
        }
        roles
    }

    fn is_blocked(&self, subject: &Address) -> bool {
        self.roles_of(subject, &Scope::Global).contains(Roles::BLOCKED)
    }

    fn subject_rows<'a>(
        &'a self,
        subject: &'a Address,
    ) -> impl Iterator<Item = (&'a (Address, Scope), &'a Roles)> + 'a {
        self.entries
            .range((*subject, Scope::Global)..)
            .take_while(move |((s, _), _)| s == subject)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Give `member` the role an `Add*` capability stands for.
    ///
    /// Precondition: the caller holds `capability` in this scope.
    pub fn grant(
        &mut self,
        member: &Address,
        group: &Address,
        contract: &Address,
        capability: Capability,
    ) -> Result<()> {
        let role = capability
            .target_role()
            .filter(|_| capability.is_add())
            .ok_or(PermsError::NotGrantable(capability))?;
        let scope = self.target_scope(group, contract, capability)?;

        self.entry(*member, scope).insert(role);
        tracing::debug!(%member, %scope, %capability, "granted");
        Ok(())
    }

    /// Take away the role a `Del*` capability stands for.
    ///
    /// Precondition: the caller holds `capability` in this scope.
    pub fn revoke(
        &mut self,
        member: &Address,
        group: &Address,
        contract: &Address,
        capability: Capability,
    ) -> Result<()> {
        let role = capability
            .target_role()
            .filter(|_| capability.is_del())
            .ok_or(PermsError::NotRevocable(capability))?;
        let scope = self.target_scope(group, contract, capability)?;

        if let Some(roles) = self.entries.get_mut(&(*member, scope)) {
            roles.remove(role);
            if roles.is_empty() {
                self.entries.remove(&(*member, scope));
            }
        }
        tracing::debug!(%member, %scope, %capability, "revoked");
        Ok(())
    }

    /// Create a group at `address`. The creator becomes its manager.
    pub fn create_group(
        &mut self,
        creator: &Address,
        name: impl Into<String>,
        address: &Address,
        block: u64,
    ) -> Result<()> {
        if self.groups.contains_key(address) {
            return Err(PermsError::GroupExists(*address));
        }
        self.groups.insert(
            *address,
            Group {
                name: name.into(),
                creator: *creator,
                created_at: block,
            },
        );
        self.entry(*creator, Scope::Group(*address)).insert(Roles::MANAGER);
        tracing::debug!(group = %address, %creator, "group created");
        Ok(())
    }

    /// Delete a group, with every row scoped to it and every row granted
    /// to the group itself.
    pub fn delete_group(&mut self, address: &Address) -> Result<()> {
        if self.groups.remove(address).is_none() {
            return Err(PermsError::UnknownGroup(*address));
        }
        let scope = Scope::Group(*address);
        self.entries
            .retain(|(subject, row_scope), _| *row_scope != scope && subject != address);
        tracing::debug!(group = %address, "group deleted");
        Ok(())
    }

    /// Register a newly created contract. The creator becomes its manager.
    pub fn register_contract(
        &mut self,
        creator: &Address,
        contract: &Address,
        block: u64,
    ) -> Result<()> {
        if self.contracts.contains_key(contract) {
            return Err(PermsError::ContractExists(*contract));
        }
        self.contracts.insert(
            *contract,
            ContractInfo {
                creator: *creator,
                created_at: block,
            },
        );
        self.entry(*creator, Scope::Contract(*contract)).insert(Roles::MANAGER);
        tracing::debug!(%contract, %creator, block, "contract registered");
        Ok(())
    }

    fn entry(&mut self, subject: Address, scope: Scope) -> &mut Roles {
        self.entries.entry((subject, scope)).or_default()
    }

    /// Resolve and validate the scope a grant or revoke targets.
    fn target_scope(
        &self,
        group: &Address,
        contract: &Address,
        capability: Capability,
    ) -> Result<Scope> {
        let wrong = |reason| PermsError::WrongScope { capability, reason };
        match capability.scope_kind() {
            ScopeKind::Global => {
                if !group.is_zero() || !contract.is_zero() {
                    return Err(wrong("expected no group and no contract"));
                }
                Ok(Scope::Global)
            }
            ScopeKind::Group => {
                if group.is_zero() || !contract.is_zero() {
                    return Err(wrong("expected a group and no contract"));
                }
                if !self.groups.contains_key(group) {
                    return Err(PermsError::UnknownGroup(*group));
                }
                Ok(Scope::Group(*group))
            }
            ScopeKind::Contract => {
                if contract.is_zero() || !group.is_zero() {
                    return Err(wrong("expected a contract and no group"));
                }
                if !self.contracts.contains_key(contract) {
                    return Err(PermsError::UnknownContract(*contract));
                }
                Ok(Scope::Contract(*contract))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether a group exists at `address`.
    pub fn is_group(&self, address: &Address) -> bool {
        self.groups.contains_key(address)
    }

    /// Whether a contract is registered at `address`.
    pub fn is_contract(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// The group record at `address`.
    pub fn group(&self, address: &Address) -> Option<&Group> {
        self.groups.get(address)
    }

    /// The contract record at `address`.
    pub fn contract(&self, address: &Address) -> Option<&ContractInfo> {
        self.contracts.get(address)
    }

    /// The roles `subject` holds in exactly `scope` (no inheritance).
    pub fn roles_of(&self, subject: &Address, scope: &Scope) -> Roles {
        self.entries
            .get(&(*subject, *scope))
            .copied()
            .unwrap_or_default()
    }

    /// Every subject holding a role in `scope`.
    pub fn members_of(&self, scope: &Scope) -> Vec<(Address, Roles)> {
        self.entries
            .iter()
            .filter(|((_, s), _)| s == scope)
            .map(|((subject, _), roles)| (*subject, *roles))
            .collect()
    }

    /// Number of non-empty rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
