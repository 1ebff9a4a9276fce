//! # permchain cim
//!
//! Certificate identity management: which keys may act on the chain at all.
//!
//! An identity is approved when a certificate for its key is in the
//! [`CertificateStore`]. The store is seeded from genesis, written to state
//! together with the initial permission table by
//! [`CertificateStore::init_cert_and_permission`], and changed afterwards only
//! through authorized certificate calls.
//!
//! ## Key Types
//!
//! - [`Certificate`] - Parsed X.509 certificate and its chain address
//! - [`CertificateStore`] - The approved identity set
//! - [`CommitteeMember`] - Genesis committee entry

pub mod certificate;
pub mod error;
pub mod store;

pub use certificate::Certificate;
pub use error::{CimError, Result};
pub use store::{
    initialized_at, is_approved_in, CertificateStore, CommitteeMember, APPROVED_PREFIX,
    CERTIFICATES_KEY, INITIALIZED_KEY,
};
