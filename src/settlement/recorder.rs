use crate::core::member::{GroupId, MemberId};
use crate::core::records::{NewSettlement, Settlement};
use crate::settlement::ports::{MemberDirectory, SettlementStore, StoreError};
use chrono::Utc;
use log::info;
use rust_decimal::Decimal;
use thiserror::Error;

/// Why a settlement could not be recorded.
///
/// Validation variants are the caller's to fix; none of them are retried.
#[derive(Debug, Error, PartialEq)]
pub enum SettlementError {
    #[error("a settlement needs two different members, got {member} on both sides")]
    SameMember { member: MemberId },
    #[error("settlement amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },
    #[error("member {member} does not belong to group {group}")]
    MemberNotInGroup { member: MemberId, group: GroupId },
    #[error("settlement batch is empty")]
    EmptyBatch,
    #[error("batch row {index}: {source}")]
    BatchRow {
        index: usize,
        #[source]
        source: Box<SettlementError>,
    },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Validates and appends settlements.
///
/// The recorder keeps no balances. After a successful write the caller
/// re-reads the group's rows and re-aggregates.
pub struct SettlementRecorder<D, S> {
    directory: D,
    store: S,
}

impl<D: MemberDirectory, S: SettlementStore> SettlementRecorder<D, S> {
    pub fn new(directory: D, store: S) -> Self {
        Self { directory, store }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate one settlement and persist it.
    pub fn record(&self, new: NewSettlement) -> Result<Settlement, SettlementError> {
        self.validate(&new)?;
        let settlement = self.store.insert(new.into_settlement(Utc::now()))?;
        info!(
            "recorded settlement {} in group {}: {} -> {} {}",
            settlement.id(),
            settlement.group_id(),
            settlement.from(),
            settlement.to(),
            settlement.amount()
        );
        Ok(settlement)
    }

    /// Validate every row, then persist all of them as one unit.
    ///
    /// If any row is invalid nothing is written and the error names the
    /// first bad row. A storage failure likewise leaves no rows behind.
    pub fn record_batch(
        &self,
        batch: Vec<NewSettlement>,
    ) -> Result<Vec<Settlement>, SettlementError> {
        if batch.is_empty() {
            return Err(SettlementError::EmptyBatch);
        }
        for (index, new) in batch.iter().enumerate() {
            self.validate(new).map_err(|e| SettlementError::BatchRow {
                index,
                source: Box::new(e),
            })?;
        }

        let created_at = Utc::now();
        let rows: Vec<Settlement> = batch
            .into_iter()
            .map(|new| new.into_settlement(created_at))
            .collect();
        let recorded = self.store.insert_batch(rows)?;
        info!("recorded batch of {} settlements", recorded.len());
        Ok(recorded)
    }

    fn validate(&self, new: &NewSettlement) -> Result<(), SettlementError> {
        if new.from == new.to {
            return Err(SettlementError::SameMember {
                member: new.from.clone(),
            });
        }
        if new.amount <= Decimal::ZERO {
            return Err(SettlementError::NonPositiveAmount { amount: new.amount });
        }
        for member in [&new.from, &new.to] {
            if !self.directory.is_member(&new.group_id, member)? {
                return Err(SettlementError::MemberNotInGroup {
                    member: member.clone(),
                    group: new.group_id.clone(),
                });
            }
        }
        Ok(())
    }
}
