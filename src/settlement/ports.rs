//! Boundaries to the application's storage and group roster.
//!
//! The ledger never talks to a database itself. Whatever backs these traits
//! must give at least read-committed isolation on settlement inserts, and
//! `insert_batch` must be all-or-nothing.

use crate::core::member::{GroupId, MemberId};
use crate::core::records::Settlement;
use thiserror::Error;

/// Failures reported by a storage or directory backend.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("unknown group {0}")]
    UnknownGroup(GroupId),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Group membership lookups.
pub trait MemberDirectory: Send + Sync {
    fn is_member(&self, group_id: &GroupId, member_id: &MemberId) -> Result<bool, StoreError>;

    /// The authoritative roster, in the order the application lists members.
    fn members(&self, group_id: &GroupId) -> Result<Vec<MemberId>, StoreError>;
}

/// Append-only settlement storage.
pub trait SettlementStore: Send + Sync {
    fn insert(&self, settlement: Settlement) -> Result<Settlement, StoreError>;

    /// Persist every row or none of them.
    fn insert_batch(&self, settlements: Vec<Settlement>) -> Result<Vec<Settlement>, StoreError>;

    /// All settlements of a group, oldest first.
    fn list(&self, group_id: &GroupId) -> Result<Vec<Settlement>, StoreError>;
}
