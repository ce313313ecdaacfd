use crate::core::balance::{Balance, BalanceSheet, Tolerance};
use crate::core::member::MemberId;
use crate::core::records::{ExpensePayment, ExpenseSplit, LedgerError, RowKind, Settlement};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Running sums for one member.
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    paid: Decimal,
    owed: Decimal,
    settlements_in: Decimal,
    settlements_out: Decimal,
}

/// Folds expense and settlement rows into one [`Balance`] per member.
///
/// The aggregator is stateless apart from its tolerance: every call
/// recomputes from the rows it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerAggregator {
    tolerance: Tolerance,
}

impl LedgerAggregator {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Compute balances for every member of `members`.
    ///
    /// # Algorithm
    ///
    /// 1. Validate every row: amounts must be non-negative.
    /// 2. Sum payments, split shares and settlement legs per member.
    /// 3. Emit one balance per roster entry, in roster order, including
    ///    members with no activity.
    ///
    /// Rows that reference someone outside `members` are skipped. A
    /// settlement is skipped as a whole if either side is unknown so the
    /// remaining rows still sum to zero.
    pub fn aggregate(
        &self,
        splits: &[ExpenseSplit],
        payments: &[ExpensePayment],
        settlements: &[Settlement],
        members: &[MemberId],
    ) -> Result<BalanceSheet, LedgerError> {
        validate_rows(splits, payments, settlements)?;

        let mut roster: Vec<&MemberId> = Vec::with_capacity(members.len());
        let mut index: HashMap<&MemberId, usize> = HashMap::with_capacity(members.len());
        for member in members {
            if !index.contains_key(member) {
                index.insert(member, roster.len());
                roster.push(member);
            }
        }

        let mut totals = vec![Totals::default(); roster.len()];
        let mut ignored = 0usize;

        for payment in payments {
            match index.get(&payment.payer_id) {
                Some(&i) => {
                    totals[i].paid = accumulate(
                        totals[i].paid,
                        payment.amount,
                        RowKind::Payment,
                        &payment.expense_id,
                    )?
                }
                None => ignored += 1,
            }
        }

        for split in splits {
            match index.get(&split.member_id) {
                Some(&i) => {
                    totals[i].owed = accumulate(
                        totals[i].owed,
                        split.share_amount,
                        RowKind::Split,
                        &split.expense_id,
                    )?
                }
                None => ignored += 1,
            }
        }

        for settlement in settlements {
            match (index.get(settlement.from()), index.get(settlement.to())) {
                (Some(&from), Some(&to)) => {
                    let row = settlement.id().to_string();
                    totals[from].settlements_out = accumulate(
                        totals[from].settlements_out,
                        settlement.amount(),
                        RowKind::Settlement,
                        &row,
                    )?;
                    totals[to].settlements_in = accumulate(
                        totals[to].settlements_in,
                        settlement.amount(),
                        RowKind::Settlement,
                        &row,
                    )?;
                }
                _ => ignored += 1,
            }
        }

        if ignored > 0 {
            warn!(
                "ignored {} ledger rows referencing members outside the roster of {}",
                ignored,
                roster.len()
            );
        }

        let balances = roster
            .into_iter()
            .zip(totals)
            .map(|(member, t)| {
                Balance::checked_new(
                    member.clone(),
                    t.paid,
                    t.owed,
                    t.settlements_in,
                    t.settlements_out,
                )
                .map(|b| b.with_tolerance(self.tolerance))
                .ok_or_else(|| {
                    // Each total fits, so only adding settlement legs to an
                    // expense total can overflow.
                    LedgerError::invalid(
                        RowKind::Settlement,
                        member.as_str(),
                        "net balance overflows ledger total",
                    )
                })
            })
            .collect::<Result<Vec<Balance>, LedgerError>>()?;

        let sheet = BalanceSheet::new(balances, self.tolerance);
        debug!(
            "aggregated {} splits, {} payments, {} settlements into {} balances (imbalance {})",
            splits.len(),
            payments.len(),
            settlements.len(),
            sheet.len(),
            sheet.imbalance()
        );
        Ok(sheet)
    }
}

/// Aggregate with the default tolerance.
///
/// # Examples
///
/// ```
/// use split_ledger::core::member::MemberId;
/// use split_ledger::core::records::{ExpensePayment, ExpenseSplit};
/// use split_ledger::ledger::aggregator::aggregate;
/// use rust_decimal_macros::dec;
///
/// let (a, b) = (MemberId::new("A"), MemberId::new("B"));
/// let payments = vec![ExpensePayment::new("dinner", a.clone(), dec!(80))];
/// let splits = vec![
///     ExpenseSplit::new("dinner", a.clone(), dec!(40)),
///     ExpenseSplit::new("dinner", b.clone(), dec!(40)),
/// ];
///
/// let sheet = aggregate(&splits, &payments, &[], &[a.clone(), b.clone()]).unwrap();
/// assert_eq!(sheet.net(&a), dec!(40));
/// assert_eq!(sheet.net(&b), dec!(-40));
/// ```
pub fn aggregate(
    splits: &[ExpenseSplit],
    payments: &[ExpensePayment],
    settlements: &[Settlement],
    members: &[MemberId],
) -> Result<BalanceSheet, LedgerError> {
    LedgerAggregator::default().aggregate(splits, payments, settlements, members)
}

fn accumulate(
    total: Decimal,
    amount: Decimal,
    kind: RowKind,
    row: &str,
) -> Result<Decimal, LedgerError> {
    total
        .checked_add(amount)
        .ok_or_else(|| LedgerError::invalid(kind, row, "amount overflows ledger total"))
}

fn validate_rows(
    splits: &[ExpenseSplit],
    payments: &[ExpensePayment],
    settlements: &[Settlement],
) -> Result<(), LedgerError> {
    for split in splits {
        if split.share_amount < Decimal::ZERO {
            return Err(LedgerError::invalid(
                RowKind::Split,
                &split.expense_id,
                format!(
                    "negative share {} for member {}",
                    split.share_amount, split.member_id
                ),
            ));
        }
    }
    for payment in payments {
        if payment.amount < Decimal::ZERO {
            return Err(LedgerError::invalid(
                RowKind::Payment,
                &payment.expense_id,
                format!(
                    "negative payment {} by member {}",
                    payment.amount, payment.payer_id
                ),
            ));
        }
    }
    for settlement in settlements {
        if settlement.amount() <= Decimal::ZERO {
            return Err(LedgerError::invalid(
                RowKind::Settlement,
                settlement.id().to_string(),
                format!("settlement amount must be positive, got {}", settlement.amount()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::member::GroupId;
    use rust_decimal_macros::dec;

    fn members() -> Vec<MemberId> {
        vec![MemberId::new("A"), MemberId::new("B"), MemberId::new("C")]
    }

    fn dinner_for_three() -> (Vec<ExpenseSplit>, Vec<ExpensePayment>) {
        let payments = vec![ExpensePayment::new("e1", MemberId::new("A"), dec!(300))];
        let splits = members()
            .into_iter()
            .map(|m| ExpenseSplit::new("e1", m, dec!(100)))
            .collect();
        (splits, payments)
    }

    fn settlement(from: &str, to: &str, amount: rust_decimal::Decimal) -> Settlement {
        Settlement::new(
            GroupId::new("g"),
            MemberId::new(from),
            MemberId::new(to),
            amount,
            MemberId::new(from),
        )
    }

    #[test]
    fn test_equal_split_balances() {
        let (splits, payments) = dinner_for_three();
        let sheet = aggregate(&splits, &payments, &[], &members()).unwrap();

        let a = sheet.get(&MemberId::new("A")).unwrap();
        assert_eq!(a.amount_paid(), dec!(300));
        assert_eq!(a.amount_owed(), dec!(100));
        assert_eq!(a.net_balance(), dec!(200));
        assert_eq!(sheet.net(&MemberId::new("B")), dec!(-100));
        assert_eq!(sheet.net(&MemberId::new("C")), dec!(-100));
        assert!(sheet.is_balanced());
    }

    #[test]
    fn test_settlement_moves_both_sides() {
        let (splits, payments) = dinner_for_three();
        let before = aggregate(&splits, &payments, &[], &members()).unwrap();
        let after = aggregate(
            &splits,
            &payments,
            &[settlement("B", "A", dec!(100))],
            &members(),
        )
        .unwrap();

        let a = after.get(&MemberId::new("A")).unwrap();
        assert_eq!(a.settlements_in(), dec!(100));
        assert_eq!(a.net_balance(), before.net(&MemberId::new("A")) - dec!(100));
        let b = after.get(&MemberId::new("B")).unwrap();
        assert_eq!(b.settlements_out(), dec!(100));
        assert_eq!(b.net_balance(), before.net(&MemberId::new("B")) + dec!(100));
        assert!(b.is_settled());
    }

    #[test]
    fn test_inactive_member_gets_zero_balance() {
        let (splits, payments) = dinner_for_three();
        let mut roster = members();
        roster.push(MemberId::new("D"));

        let sheet = aggregate(&splits, &payments, &[], &roster).unwrap();
        let d = sheet.get(&MemberId::new("D")).unwrap();
        assert_eq!(d.net_balance(), Decimal::ZERO);
        assert!(d.is_settled());
        assert_eq!(sheet.len(), 4);
    }

    #[test]
    fn test_unknown_members_are_ignored() {
        let (mut splits, payments) = dinner_for_three();
        splits.push(ExpenseSplit::new("e1", MemberId::new("ghost"), dec!(50)));
        let settlements = vec![settlement("ghost", "A", dec!(10))];

        let sheet = aggregate(&splits, &payments, &settlements, &members()).unwrap();
        assert_eq!(sheet.len(), 3);
        assert!(sheet.get(&MemberId::new("ghost")).is_none());
        assert_eq!(sheet.net(&MemberId::new("A")), dec!(200));
    }

    #[test]
    fn test_roster_order_kept_and_deduplicated() {
        let roster = vec![
            MemberId::new("C"),
            MemberId::new("A"),
            MemberId::new("C"),
            MemberId::new("B"),
        ];
        let sheet = aggregate(&[], &[], &[], &roster).unwrap();
        let order: Vec<&str> = sheet.iter().map(|b| b.member_id().as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_negative_share_is_rejected() {
        let splits = vec![ExpenseSplit::new("e9", MemberId::new("A"), dec!(-5))];
        let err = aggregate(&splits, &[], &[], &members()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidLedgerRow { kind: RowKind::Split, ref row, .. } if row == "e9"
        ));
    }

    #[test]
    fn test_negative_payment_is_rejected_even_for_non_members() {
        let payments = vec![ExpensePayment::new("e3", MemberId::new("ghost"), dec!(-1))];
        let err = aggregate(&[], &payments, &[], &members()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidLedgerRow { kind: RowKind::Payment, .. }
        ));
    }

    #[test]
    fn test_zero_settlement_is_rejected() {
        let zero = settlement("B", "A", dec!(0));
        let err = aggregate(&[], &[], &[zero.clone()], &members()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidLedgerRow {
                kind: RowKind::Settlement,
                row: zero.id().to_string(),
                reason: "settlement amount must be positive, got 0".to_string(),
            }
        );
    }

    #[test]
    fn test_overflowing_payments_are_rejected() {
        let payments = vec![
            ExpensePayment::new("e1", MemberId::new("A"), Decimal::MAX),
            ExpensePayment::new("e2", MemberId::new("A"), Decimal::MAX),
        ];
        let err = aggregate(&[], &payments, &[], &members()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidLedgerRow {
                kind: RowKind::Payment,
                row: "e2".to_string(),
                reason: "amount overflows ledger total".to_string(),
            }
        );
    }

    #[test]
    fn test_overflowing_net_is_rejected() {
        let payments = vec![ExpensePayment::new("e1", MemberId::new("A"), Decimal::MAX)];
        let settlements = vec![settlement("A", "B", dec!(1))];
        let err = aggregate(&[], &payments, &settlements, &members()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidLedgerRow { kind: RowKind::Settlement, ref row, .. } if row == "A"
        ));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let (splits, payments) = dinner_for_three();
        let settlements = vec![settlement("C", "A", dec!(33.33))];
        let first = aggregate(&splits, &payments, &settlements, &members()).unwrap();
        let second = aggregate(&splits, &payments, &settlements, &members()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_tolerance_flows_into_balances() {
        let payments = vec![ExpensePayment::new("e1", MemberId::new("A"), dec!(1))];
        let splits = vec![
            ExpenseSplit::new("e1", MemberId::new("A"), dec!(0.5)),
            ExpenseSplit::new("e1", MemberId::new("B"), dec!(0.5)),
        ];
        let aggregator = LedgerAggregator::new(Tolerance::new(dec!(1)));
        let sheet = aggregator
            .aggregate(&splits, &payments, &[], &members())
            .unwrap();
        assert!(sheet.iter().all(Balance::is_settled));
    }
}
