//! Role bitsets stored in permission rows.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// The roles a subject holds in one scope.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roles(u16);

impl Roles {
    /// May send ordinary transactions (global).
    pub const SEND_TX: Self = Self(1 << 0);
    /// May grant and revoke `SendTx` and its manager role (global).
    pub const SEND_TX_MANAGER: Self = Self(1 << 1);
    /// May create contracts (global).
    pub const CREATE_CONTRACT: Self = Self(1 << 2);
    /// May grant and revoke `CreateContract` and its manager role (global).
    pub const CREATE_CONTRACT_MANAGER: Self = Self(1 << 3);
    /// Member of a group or contract.
    pub const MEMBER: Self = Self(1 << 4);
    /// Manager of a group or contract.
    pub const MANAGER: Self = Self(1 << 5);
    /// Chain root: certificate and list management (global).
    pub const ROOT: Self = Self(1 << 6);
    /// Blacklisted: denied everything (global).
    pub const BLOCKED: Self = Self(1 << 7);
    /// Whitelisted: may send transactions (global).
    pub const WHITELISTED: Self = Self(1 << 8);

    const NAMED: [(Roles, &'static str); 9] = [
        (Self::SEND_TX, "SEND_TX"),
        (Self::SEND_TX_MANAGER, "SEND_TX_MANAGER"),
        (Self::CREATE_CONTRACT, "CREATE_CONTRACT"),
        (Self::CREATE_CONTRACT_MANAGER, "CREATE_CONTRACT_MANAGER"),
        (Self::MEMBER, "MEMBER"),
        (Self::MANAGER, "MANAGER"),
        (Self::ROOT, "ROOT"),
        (Self::BLOCKED, "BLOCKED"),
        (Self::WHITELISTED, "WHITELISTED"),
    ];

    const ALL_BITS: u16 = (1 << 9) - 1;

    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u16) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    /// Whether no role is set.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every role in `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any role in `other` is set.
    pub const fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Set the roles in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the roles in `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Roles in both sets.
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}

impl BitOr for Roles {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Roles {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Roles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(role, _)| self.contains(*role))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Roles({})", names.join(" | "))
    }
}
