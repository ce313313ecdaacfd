//! Raw ledger rows as read from the group's storage.
//!
//! Splits and payments are written by the expense-entry side of the
//! application; settlements are appended through
//! [`SettlementRecorder`](crate::settlement::recorder::SettlementRecorder).
//! Nothing in this crate edits or deletes a row once it exists.

use crate::core::member::{GroupId, MemberId};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Which kind of ledger row a fault was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Split,
    Payment,
    Settlement,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKind::Split => write!(f, "expense split"),
            RowKind::Payment => write!(f, "expense payment"),
            RowKind::Settlement => write!(f, "settlement"),
        }
    }
}

/// Data-integrity faults in upstream ledger rows.
///
/// These are never coerced to zero: a bad row would silently skew every
/// member's balance in the group.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("invalid {kind} row {row}: {reason}")]
    InvalidLedgerRow {
        kind: RowKind,
        /// Identifier of the offending row (expense id or settlement id).
        row: String,
        reason: String,
    },
}

impl LedgerError {
    pub(crate) fn invalid(kind: RowKind, row: impl Into<String>, reason: impl Into<String>) -> Self {
        LedgerError::InvalidLedgerRow {
            kind,
            row: row.into(),
            reason: reason.into(),
        }
    }
}

/// Convert a binary float amount from upstream into a decimal.
///
/// NaN, infinities and values outside the decimal range are rejected.
pub fn decimal_from_f64(value: f64, kind: RowKind, row: &str) -> Result<Decimal, LedgerError> {
    if !value.is_finite() {
        return Err(LedgerError::invalid(
            kind,
            row,
            format!("amount {value} is not finite"),
        ));
    }
    Decimal::from_f64(value).ok_or_else(|| {
        LedgerError::invalid(kind, row, format!("amount {value} is out of range"))
    })
}

/// Parse a decimal amount from its string form.
pub fn parse_amount(value: &str, kind: RowKind, row: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(value.trim())
        .map_err(|e| LedgerError::invalid(kind, row, format!("amount '{value}': {e}")))
}

/// "Member X owes `share` for expense Z."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub expense_id: String,
    pub member_id: MemberId,
    pub share_amount: Decimal,
}

impl ExpenseSplit {
    pub fn new(expense_id: impl Into<String>, member_id: MemberId, share_amount: Decimal) -> Self {
        Self {
            expense_id: expense_id.into(),
            member_id,
            share_amount,
        }
    }

    /// Build a split from a float share, rejecting non-finite values.
    pub fn from_f64(
        expense_id: impl Into<String>,
        member_id: MemberId,
        share_amount: f64,
    ) -> Result<Self, LedgerError> {
        let expense_id = expense_id.into();
        let share_amount = decimal_from_f64(share_amount, RowKind::Split, &expense_id)?;
        Ok(Self::new(expense_id, member_id, share_amount))
    }
}

/// "Member X paid `amount` for expense Z."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpensePayment {
    pub expense_id: String,
    pub payer_id: MemberId,
    pub amount: Decimal,
}

impl ExpensePayment {
    pub fn new(expense_id: impl Into<String>, payer_id: MemberId, amount: Decimal) -> Self {
        Self {
            expense_id: expense_id.into(),
            payer_id,
            amount,
        }
    }

    pub fn from_f64(
        expense_id: impl Into<String>,
        payer_id: MemberId,
        amount: f64,
    ) -> Result<Self, LedgerError> {
        let expense_id = expense_id.into();
        let amount = decimal_from_f64(amount, RowKind::Payment, &expense_id)?;
        Ok(Self::new(expense_id, payer_id, amount))
    }
}

/// A recorded transfer between two members of a group.
///
/// Settlements are immutable once created. The serialized shape matches the
/// storage row: `group_id, from_user_id, to_user_id, amount, note,
/// created_by, created_at`.
///
/// # Examples
///
/// ```
/// use split_ledger::core::member::{GroupId, MemberId};
/// use split_ledger::core::records::Settlement;
/// use rust_decimal_macros::dec;
///
/// let settlement = Settlement::new(
///     GroupId::new("flat-42"),
///     MemberId::new("bob"),
///     MemberId::new("alice"),
///     dec!(25.50),
///     MemberId::new("bob"),
/// )
/// .with_note("groceries");
///
/// assert_eq!(settlement.amount(), dec!(25.50));
/// assert_eq!(settlement.note(), Some("groceries"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    id: Uuid,
    group_id: GroupId,
    #[serde(rename = "from_user_id")]
    from: MemberId,
    #[serde(rename = "to_user_id")]
    to: MemberId,
    amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    created_by: MemberId,
    created_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(
        group_id: GroupId,
        from: MemberId,
        to: MemberId,
        amount: Decimal,
        created_by: MemberId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            from,
            to,
            amount,
            note: None,
            created_by,
            created_at: Utc::now(),
        }
    }

    /// Use a specific id (useful for testing / determinism).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn from(&self) -> &MemberId {
        &self.from
    }

    pub fn to(&self) -> &MemberId {
        &self.to
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_by(&self) -> &MemberId {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A settlement the caller wants recorded. Validated by the recorder
/// before it becomes a [`Settlement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSettlement {
    pub group_id: GroupId,
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    pub created_by: MemberId,
}

impl NewSettlement {
    pub fn new(
        group_id: GroupId,
        from: MemberId,
        to: MemberId,
        amount: Decimal,
        created_by: MemberId,
    ) -> Self {
        Self {
            group_id,
            from,
            to,
            amount,
            note: None,
            created_by,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub(crate) fn into_settlement(self, created_at: DateTime<Utc>) -> Settlement {
        Settlement {
            id: Uuid::new_v4(),
            group_id: self.group_id,
            from: self.from,
            to: self.to,
            amount: self.amount,
            note: self.note,
            created_by: self.created_by,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_split_from_f64() {
        let split = ExpenseSplit::from_f64("e1", MemberId::new("a"), 33.25).unwrap();
        assert_eq!(split.share_amount, dec!(33.25));
    }

    #[test]
    fn test_non_finite_amounts_rejected() {
        let err = ExpenseSplit::from_f64("e1", MemberId::new("a"), f64::NAN).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidLedgerRow { kind: RowKind::Split, ref row, .. } if row == "e1"
        ));

        let err = ExpensePayment::from_f64("e2", MemberId::new("a"), f64::INFINITY).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidLedgerRow { kind: RowKind::Payment, .. }
        ));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 12.50 ", RowKind::Payment, "e1").unwrap(), dec!(12.50));
        assert!(parse_amount("twelve", RowKind::Payment, "e1").is_err());
    }

    #[test]
    fn test_settlement_row_shape() {
        let settlement = Settlement::new(
            GroupId::new("g1"),
            MemberId::new("bob"),
            MemberId::new("alice"),
            dec!(100),
            MemberId::new("bob"),
        );
        let json: serde_json::Value = serde_json::to_value(&settlement).unwrap();
        assert_eq!(json["group_id"], "g1");
        assert_eq!(json["from_user_id"], "bob");
        assert_eq!(json["to_user_id"], "alice");
        assert_eq!(json["created_by"], "bob");
        assert!(json.get("note").is_none());
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn test_new_settlement_conversion_keeps_fields() {
        let now = Utc::now();
        let settlement = NewSettlement::new(
            GroupId::new("g1"),
            MemberId::new("c"),
            MemberId::new("a"),
            dec!(40),
            MemberId::new("a"),
        )
        .with_note("taxi")
        .into_settlement(now);

        assert_eq!(settlement.from().as_str(), "c");
        assert_eq!(settlement.to().as_str(), "a");
        assert_eq!(settlement.note(), Some("taxi"));
        assert_eq!(settlement.created_at(), now);
    }
}
