//! In-process implementations of the settlement ports, used by the CLI,
//! the demos and tests.

use crate::core::member::{GroupId, MemberId};
use crate::core::records::Settlement;
use crate::settlement::ports::{MemberDirectory, SettlementStore, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Rosters keyed by group.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    groups: HashMap<GroupId, Vec<MemberId>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group with its roster. Duplicate member ids are dropped.
    pub fn add_group(&mut self, group_id: GroupId, members: impl IntoIterator<Item = MemberId>) {
        let mut roster: Vec<MemberId> = Vec::new();
        for member in members {
            if !roster.contains(&member) {
                roster.push(member);
            }
        }
        self.groups.insert(group_id, roster);
    }
}

impl MemberDirectory for InMemoryDirectory {
    fn is_member(&self, group_id: &GroupId, member_id: &MemberId) -> Result<bool, StoreError> {
        self.groups
            .get(group_id)
            .map(|roster| roster.contains(member_id))
            .ok_or_else(|| StoreError::UnknownGroup(group_id.clone()))
    }

    fn members(&self, group_id: &GroupId) -> Result<Vec<MemberId>, StoreError> {
        self.groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownGroup(group_id.clone()))
    }
}

/// Settlement rows held in memory, appended under a single lock so batch
/// inserts are atomic.
#[derive(Debug, Default)]
pub struct InMemorySettlementStore {
    rows: Mutex<HashMap<GroupId, Vec<Settlement>>>,
    fail_next_write: AtomicBool,
}

impl InMemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next insert fail with [`StoreError::Unavailable`].
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .map(|rows| rows.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl SettlementStore for InMemorySettlementStore {
    fn insert(&self, settlement: Settlement) -> Result<Settlement, StoreError> {
        self.insert_batch(vec![settlement])?
            .pop()
            .ok_or_else(|| StoreError::Rejected("empty insert".to_string()))
    }

    fn insert_batch(&self, settlements: Vec<Settlement>) -> Result<Vec<Settlement>, StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Unavailable("settlement store lock poisoned".to_string()))?;
        self.check_write()?;

        for settlement in &settlements {
            rows.entry(settlement.group_id().clone())
                .or_default()
                .push(settlement.clone());
        }
        Ok(settlements)
    }

    fn list(&self, group_id: &GroupId) -> Result<Vec<Settlement>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Unavailable("settlement store lock poisoned".to_string()))?;
        Ok(rows.get(group_id).cloned().unwrap_or_default())
    }
}
