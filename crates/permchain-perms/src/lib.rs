//! # permchain perms
//!
//! The permission table: who may do what, and where.
//!
//! ## Overview
//!
//! Permissions are rows keyed by `(subject, scope)`, each holding a set of
//! [`Roles`]. A [`Capability`] check picks its scope from the group and
//! contract fields of the request and answers from the matching rows.
//! Manager roles let a subject grant and revoke the corresponding role for
//! others in the same scope, never in another one.
//!
//! ## Key Types
//!
//! - [`PermissionTable`] - The table, with checks, mutations and persistence
//! - [`Capability`] - Action and modify capability kinds
//! - [`Scope`] - Global, group, or contract
//! - [`Roles`] - Role bitset stored per row
//! - [`Authorization`] - Proof that a check passed
//!
//! ## Usage
//!
//! ```rust
//! use permchain_core::Address;
//! use permchain_perms::{Capability, PermissionTable};
//!
//! let root = Address::from_bytes([1; 20]);
//! let user = Address::from_bytes([2; 20]);
//! let mut table = PermissionTable::genesis(&[root]);
//!
//! let zero = Address::ZERO;
//! assert!(table.check_action_perm(&root, &zero, &zero, Capability::AddSendTxPerm));
//! table.grant(&user, &zero, &zero, Capability::AddSendTxPerm).unwrap();
//! assert!(table.check_action_perm(&user, &zero, &zero, Capability::SendTx));
//! ```

pub mod capability;
pub mod error;
pub mod roles;
pub mod table;

pub use capability::{Capability, Scope, ScopeKind};
pub use error::{PermsError, Result};
pub use roles::Roles;
pub use table::{Authorization, ContractInfo, Group, PermissionTable, COMMITTEE_ROLES, TABLE_KEY};
