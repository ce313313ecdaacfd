use crate::core::member::MemberId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default tolerance below which a balance counts as zero (0.01 currency unit).
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// The ε used to classify balances.
///
/// A value `x` is within tolerance iff `|x| <= ε`. Every comparison in the
/// crate goes through this type so the boundary is treated the same way
/// by classification and by the simplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tolerance(Decimal);

impl Tolerance {
    /// Negative inputs are taken by absolute value.
    pub fn new(epsilon: Decimal) -> Self {
        Self(epsilon.abs())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self, amount: Decimal) -> bool {
        amount.abs() <= self.0
    }

    pub fn is_positive(&self, amount: Decimal) -> bool {
        amount > self.0
    }

    pub fn is_negative(&self, amount: Decimal) -> bool {
        amount < -self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(DEFAULT_TOLERANCE)
    }
}

/// One member's net position in a group.
///
/// Balances are derived values: they are produced by
/// [`aggregate`](crate::ledger::aggregator::aggregate) and never mutated.
/// A positive `net_balance` means the member is owed money, a negative one
/// means they owe.
///
/// Money a member sends in a settlement pays down what they owe, money they
/// receive pays down what they are owed:
/// `net = (paid + settlements_out) - (owed + settlements_in)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    member_id: MemberId,
    amount_paid: Decimal,
    amount_owed: Decimal,
    settlements_in: Decimal,
    settlements_out: Decimal,
    net_balance: Decimal,
    #[serde(skip)]
    tolerance: Tolerance,
}

impl Balance {
    /// Build a balance from its four totals.
    ///
    /// Returns `None` if the net balance does not fit in a `Decimal`.
    pub fn checked_new(
        member_id: MemberId,
        amount_paid: Decimal,
        amount_owed: Decimal,
        settlements_in: Decimal,
        settlements_out: Decimal,
    ) -> Option<Self> {
        let credit = amount_paid.checked_add(settlements_out)?;
        let debit = amount_owed.checked_add(settlements_in)?;
        let net_balance = credit.checked_sub(debit)?;
        Some(Self {
            member_id,
            amount_paid,
            amount_owed,
            settlements_in,
            settlements_out,
            net_balance,
            tolerance: Tolerance::default(),
        })
    }

    /// A balance with only a net figure: positive nets are booked as paid,
    /// negative ones as owed.
    pub fn from_net(member_id: MemberId, net_balance: Decimal) -> Self {
        let (amount_paid, amount_owed) = if net_balance >= Decimal::ZERO {
            (net_balance, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -net_balance)
        };
        Self {
            member_id,
            amount_paid,
            amount_owed,
            settlements_in: Decimal::ZERO,
            settlements_out: Decimal::ZERO,
            net_balance,
            tolerance: Tolerance::default(),
        }
    }

    /// A member with no activity at all.
    pub fn zero(member_id: MemberId) -> Self {
        Self::from_net(member_id, Decimal::ZERO)
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    pub fn amount_owed(&self) -> Decimal {
        self.amount_owed
    }

    pub fn settlements_in(&self) -> Decimal {
        self.settlements_in
    }

    pub fn settlements_out(&self) -> Decimal {
        self.settlements_out
    }

    pub fn net_balance(&self) -> Decimal {
        self.net_balance
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Owed money: `net_balance > ε`.
    pub fn is_creditor(&self) -> bool {
        self.tolerance.is_positive(self.net_balance)
    }

    /// Owes money: `net_balance < -ε`.
    pub fn is_debtor(&self) -> bool {
        self.tolerance.is_negative(self.net_balance)
    }

    pub fn is_settled(&self) -> bool {
        !self.is_creditor() && !self.is_debtor()
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_creditor() {
            "CREDITOR"
        } else if self.is_debtor() {
            "DEBTOR"
        } else {
            "SETTLED"
        };
        write!(
            f,
            "{:<15} paid {:>10} owed {:>10} in {:>10} out {:>10} net {:>10} [{}]",
            self.member_id,
            self.amount_paid,
            self.amount_owed,
            self.settlements_in,
            self.settlements_out,
            self.net_balance,
            status
        )
    }
}

/// Every member's balance for one group, in roster order.
///
/// Roster order matters: the simplifier breaks ties between equal balances
/// by input order, so keeping it here makes suggestions reproducible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSheet {
    balances: Vec<Balance>,
    #[serde(skip)]
    index: HashMap<MemberId, usize>,
    #[serde(skip)]
    tolerance: Tolerance,
}

impl BalanceSheet {
    pub fn new(balances: Vec<Balance>, tolerance: Tolerance) -> Self {
        let index = balances
            .iter()
            .enumerate()
            .map(|(i, b)| (b.member_id().clone(), i))
            .collect();
        Self {
            balances,
            index,
            tolerance,
        }
    }

    pub fn get(&self, member: &MemberId) -> Option<&Balance> {
        self.index.get(member).map(|&i| &self.balances[i])
    }

    /// Net balance of a member; zero for members not on the sheet.
    pub fn net(&self, member: &MemberId) -> Decimal {
        self.get(member)
            .map(Balance::net_balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn balances(&self) -> &[Balance] {
        &self.balances
    }

    pub fn iter(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn creditors(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(|b| b.is_creditor())
    }

    pub fn debtors(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(|b| b.is_debtor())
    }

    pub fn settled(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(|b| b.is_settled())
    }

    /// Sum of all net balances. Zero for consistent data; saturates at the
    /// `Decimal` bounds for wildly inconsistent data.
    pub fn imbalance(&self) -> Decimal {
        self.balances
            .iter()
            .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.net_balance()))
    }

    /// Data-quality check: the ledger sums to zero within tolerance.
    pub fn is_balanced(&self) -> bool {
        self.tolerance.is_zero(self.imbalance())
    }

    /// Total that has to change hands to settle the group
    /// (sum of positive nets).
    pub fn total_outstanding(&self) -> Decimal {
        self.balances
            .iter()
            .map(Balance::net_balance)
            .filter(|net| *net > Decimal::ZERO)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn to_map(&self) -> HashMap<MemberId, Balance> {
        self.balances
            .iter()
            .map(|b| (b.member_id().clone(), b.clone()))
            .collect()
    }
}

impl fmt::Display for BalanceSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Balances ===")?;
        for balance in &self.balances {
            writeln!(f, "  {}", balance)?;
        }
        writeln!(f, "Outstanding:    {}", self.total_outstanding())?;
        writeln!(f, "Imbalance:      {}", self.imbalance())?;
        writeln!(f, "Balanced:       {}", self.is_balanced())
    }
}
