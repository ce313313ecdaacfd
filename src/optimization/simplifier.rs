use crate::core::balance::{Balance, BalanceSheet, Tolerance};
use crate::core::member::{GroupId, MemberId};
use crate::core::records::NewSettlement;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A proposed payment that would move the group toward zero balances.
///
/// Suggestions are not persisted. A user may accept, edit or discard each
/// one; accepted ones go through the settlement recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTransfer {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Decimal,
}

impl SuggestedTransfer {
    /// Turn an accepted suggestion into input for the settlement recorder.
    pub fn into_new_settlement(self, group_id: GroupId, created_by: MemberId) -> NewSettlement {
        NewSettlement::new(group_id, self.from, self.to, self.amount, created_by)
    }
}

impl fmt::Display for SuggestedTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pays {} {}", self.from, self.to, self.amount)
    }
}

/// Internal invariant violations. Reaching one means the simplifier is wrong,
/// not the input.
#[derive(Debug, Error, PartialEq)]
pub enum SimplifyError {
    #[error("simplifier produced a negative transfer of {amount} from {from} to {to}")]
    Internal {
        from: MemberId,
        to: MemberId,
        amount: Decimal,
    },
}

/// Output of [`DebtSimplifier::plan`]: the transfers plus some bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementPlan {
    transfers: Vec<SuggestedTransfer>,
    debtor_count: usize,
    creditor_count: usize,
    /// Amount left unmatched because the input did not sum to zero.
    residual: Decimal,
}

impl SettlementPlan {
    pub fn transfers(&self) -> &[SuggestedTransfer] {
        &self.transfers
    }

    pub fn into_transfers(self) -> Vec<SuggestedTransfer> {
        self.transfers
    }

    pub fn debtor_count(&self) -> usize {
        self.debtor_count
    }

    pub fn creditor_count(&self) -> usize {
        self.creditor_count
    }

    pub fn residual(&self) -> Decimal {
        self.residual
    }

    /// Sum of all suggested transfer amounts, saturating at `Decimal::MAX`.
    pub fn total(&self) -> Decimal {
        self.transfers
            .iter()
            .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount))
    }

    /// Upper bound on the number of transfers: `debtors + creditors - 1`.
    pub fn transfer_bound(&self) -> usize {
        (self.debtor_count + self.creditor_count).saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }
}

impl fmt::Display for SettlementPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Suggested Transfers ===")?;
        if self.transfers.is_empty() {
            writeln!(f, "  Everyone is settled up.")?;
        }
        for transfer in &self.transfers {
            writeln!(f, "  {}", transfer)?;
        }
        writeln!(f, "Transfers:      {}", self.transfers.len())?;
        writeln!(f, "Total:          {}", self.total())?;
        writeln!(f, "Residual:       {}", self.residual)
    }
}

/// One side of the matching: a member and what is left of their balance.
#[derive(Debug, Clone, Copy)]
struct Position<'a> {
    member: &'a MemberId,
    remaining: Decimal,
    /// Already took part in a move too small to report.
    absorbed: bool,
}

impl<'a> Position<'a> {
    fn open(balance: &'a Balance) -> Self {
        Self {
            member: balance.member_id(),
            remaining: balance.net_balance(),
            absorbed: false,
        }
    }
}

/// Greedy debt simplifier.
///
/// Pairs the largest debtor with the largest creditor until one side runs
/// out. This does not guarantee the minimum possible number of transfers,
/// but it never emits more than `debtors + creditors - 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebtSimplifier {
    tolerance: Tolerance,
}

impl DebtSimplifier {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Compute suggested transfers for a set of balances.
    ///
    /// # Algorithm
    ///
    /// 1. Split members into debtors (`net < -ε`) and creditors (`net > ε`);
    ///    everyone else is left out.
    /// 2. Stable-sort debtors most negative first, creditors largest first.
    ///    Equal balances keep their input order.
    /// 3. Walk both lists with one cursor each. Each step moves
    ///    `min(|debtor|, creditor)` and emits it if it exceeds ε.
    /// 4. A cursor advances once its remaining amount is strictly below ε.
    ///
    /// Because neither cursor stops at exactly ε, every step moves at least
    /// ε, and a step of exactly ε goes unreported. Such a step is emitted
    /// anyway if either member already sat out an earlier one, so no member
    /// ends more than ε away from zero.
    ///
    /// Whatever is left when one list runs out is residual imbalance from
    /// the input and is not reported as a transfer.
    pub fn plan(&self, balances: &[Balance]) -> Result<SettlementPlan, SimplifyError> {
        let tolerance = self.tolerance;

        let mut debtors: Vec<Position<'_>> = balances
            .iter()
            .filter(|b| tolerance.is_negative(b.net_balance()))
            .map(Position::open)
            .collect();
        let mut creditors: Vec<Position<'_>> = balances
            .iter()
            .filter(|b| tolerance.is_positive(b.net_balance()))
            .map(Position::open)
            .collect();

        debtors.sort_by(|a, b| a.remaining.cmp(&b.remaining));
        creditors.sort_by(|a, b| b.remaining.cmp(&a.remaining));

        let mut transfers = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < debtors.len() && j < creditors.len() {
            let debtor = &mut debtors[i];
            let creditor = &mut creditors[j];
            let amount = debtor.remaining.abs().min(creditor.remaining);

            if amount < Decimal::ZERO {
                return Err(SimplifyError::Internal {
                    from: debtor.member.clone(),
                    to: creditor.member.clone(),
                    amount,
                });
            }

            if tolerance.is_positive(amount) || debtor.absorbed || creditor.absorbed {
                transfers.push(SuggestedTransfer {
                    from: debtor.member.clone(),
                    to: creditor.member.clone(),
                    amount,
                });
            } else {
                debtor.absorbed = true;
                creditor.absorbed = true;
            }

            creditor.remaining -= amount;
            debtor.remaining += amount;

            if debtor.remaining.is_zero() || debtor.remaining.abs() < tolerance.value() {
                i += 1;
            }
            if creditor.remaining.is_zero() || creditor.remaining < tolerance.value() {
                j += 1;
            }
        }

        // Only one side can have anything left here, all of one sign.
        let residual = debtors[i..]
            .iter()
            .chain(creditors[j..].iter())
            .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.remaining));

        if !tolerance.is_zero(residual) {
            warn!(
                "balances do not sum to zero: {} left unmatched after {} transfers",
                residual,
                transfers.len()
            );
        }
        debug!(
            "simplified {} debtors and {} creditors into {} transfers",
            debtors.len(),
            creditors.len(),
            transfers.len()
        );

        Ok(SettlementPlan {
            transfers,
            debtor_count: debtors.len(),
            creditor_count: creditors.len(),
            residual,
        })
    }

    /// Transfers only. See [`plan`](Self::plan).
    pub fn simplify(&self, balances: &[Balance]) -> Result<Vec<SuggestedTransfer>, SimplifyError> {
        self.plan(balances).map(SettlementPlan::into_transfers)
    }

    /// Simplify a whole sheet using the sheet's own tolerance.
    pub fn simplify_sheet(sheet: &BalanceSheet) -> Result<SettlementPlan, SimplifyError> {
        DebtSimplifier::new(sheet.tolerance()).plan(sheet.balances())
    }
}

/// Simplify with the default tolerance.
///
/// # Examples
///
/// ```
/// use split_ledger::core::balance::Balance;
/// use split_ledger::core::member::MemberId;
/// use split_ledger::optimization::simplifier::simplify;
/// use rust_decimal_macros::dec;
///
/// let balances = vec![
///     Balance::from_net(MemberId::new("A"), dec!(-150)),
///     Balance::from_net(MemberId::new("B"), dec!(100)),
///     Balance::from_net(MemberId::new("C"), dec!(50)),
/// ];
/// let transfers = simplify(&balances).unwrap();
/// assert_eq!(transfers.len(), 2);
/// assert_eq!(transfers[0].amount, dec!(100));
/// ```
pub fn simplify(balances: &[Balance]) -> Result<Vec<SuggestedTransfer>, SimplifyError> {
    DebtSimplifier::default().simplify(balances)
}

/// Net balance per member after hypothetically executing `transfers`.
///
/// The sender's balance rises by the amount, the receiver's falls by it.
/// Members appear in the order of `balances`.
pub fn apply_transfers(
    balances: &[Balance],
    transfers: &[SuggestedTransfer],
) -> Vec<(MemberId, Decimal)> {
    let mut remaining: Vec<(MemberId, Decimal)> = balances
        .iter()
        .map(|b| (b.member_id().clone(), b.net_balance()))
        .collect();
    let index: HashMap<MemberId, usize> = remaining
        .iter()
        .enumerate()
        .map(|(i, (m, _))| (m.clone(), i))
        .collect();

    for transfer in transfers {
        if let Some(&i) = index.get(&transfer.from) {
            remaining[i].1 += transfer.amount;
        }
        if let Some(&i) = index.get(&transfer.to) {
            remaining[i].1 -= transfer.amount;
        }
    }
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balances(nets: &[(&str, Decimal)]) -> Vec<Balance> {
        nets.iter()
            .map(|(m, net)| Balance::from_net(MemberId::new(*m), *net))
            .collect()
    }

    fn transfer(from: &str, to: &str, amount: Decimal) -> SuggestedTransfer {
        SuggestedTransfer {
            from: MemberId::new(from),
            to: MemberId::new(to),
            amount,
        }
    }

    #[test]
    fn test_one_payer_two_debtors_keeps_input_order() {
        let input = balances(&[("A", dec!(200)), ("B", dec!(-100)), ("C", dec!(-100))]);
        let transfers = simplify(&input).unwrap();
        assert_eq!(
            transfers,
            vec![transfer("B", "A", dec!(100)), transfer("C", "A", dec!(100))]
        );
    }

    #[test]
    fn test_one_debtor_two_creditors_skips_settled_member() {
        let input = balances(&[
            ("A", dec!(-150)),
            ("B", dec!(100)),
            ("C", dec!(50)),
            ("D", dec!(0)),
        ]);
        let transfers = simplify(&input).unwrap();
        assert_eq!(
            transfers,
            vec![transfer("A", "B", dec!(100)), transfer("A", "C", dec!(50))]
        );
        assert!(transfers
            .iter()
            .all(|t| t.from.as_str() != "D" && t.to.as_str() != "D"));
    }

    #[test]
    fn test_largest_positions_matched_first() {
        let input = balances(&[
            ("A", dec!(-10)),
            ("B", dec!(-90)),
            ("C", dec!(30)),
            ("D", dec!(70)),
        ]);
        let transfers = simplify(&input).unwrap();
        assert_eq!(
            transfers,
            vec![
                transfer("B", "D", dec!(70)),
                transfer("B", "C", dec!(20)),
                transfer("A", "C", dec!(10)),
            ]
        );
    }

    #[test]
    fn test_settled_group_yields_nothing() {
        let input = balances(&[("A", dec!(0)), ("B", dec!(0.01)), ("C", dec!(-0.01))]);
        let plan = DebtSimplifier::default().plan(&input).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.debtor_count(), 0);
        assert_eq!(plan.creditor_count(), 0);
        assert!(simplify(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_only_creditors_yields_nothing() {
        let input = balances(&[("A", dec!(10)), ("B", dec!(5))]);
        let plan = DebtSimplifier::default().plan(&input).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.residual(), dec!(15));
    }

    #[test]
    fn test_residual_from_inconsistent_input_is_not_transferred() {
        let input = balances(&[("A", dec!(-100)), ("B", dec!(60))]);
        let plan = DebtSimplifier::default().plan(&input).unwrap();
        assert_eq!(plan.transfers(), &[transfer("A", "B", dec!(60))]);
        assert_eq!(plan.residual(), dec!(-40));
    }

    #[test]
    fn test_sub_tolerance_remainder_not_emitted() {
        let input = balances(&[("A", dec!(-10.005)), ("B", dec!(10))]);
        let transfers = simplify(&input).unwrap();
        assert_eq!(transfers, vec![transfer("A", "B", dec!(10))]);
    }

    #[test]
    fn test_transfer_count_bound() {
        let input = balances(&[
            ("A", dec!(-25)),
            ("B", dec!(-25)),
            ("C", dec!(-50)),
            ("D", dec!(40)),
            ("E", dec!(35)),
            ("F", dec!(25)),
        ]);
        let plan = DebtSimplifier::default().plan(&input).unwrap();
        assert!(plan.transfers().len() <= plan.transfer_bound());
        assert_eq!(plan.transfer_bound(), 5);
        assert_eq!(plan.total(), dec!(100));
    }

    #[test]
    fn test_applying_plan_clears_group() {
        let input = balances(&[
            ("A", dec!(-33.33)),
            ("B", dec!(-33.34)),
            ("C", dec!(66.67)),
        ]);
        let transfers = simplify(&input).unwrap();
        let after = apply_transfers(&input, &transfers);
        let tolerance = Tolerance::default();
        assert!(after.iter().all(|(_, net)| tolerance.is_zero(*net)));
    }

    #[test]
    fn test_cent_remainders_are_carried_to_the_last_creditor() {
        let input = balances(&[
            ("D1", dec!(-10.01)),
            ("D2", dec!(-10.01)),
            ("C1", dec!(10)),
            ("C2", dec!(10)),
            ("C3", dec!(0.02)),
        ]);
        let plan = DebtSimplifier::default().plan(&input).unwrap();
        assert_eq!(
            plan.transfers(),
            &[
                transfer("D1", "C1", dec!(10)),
                transfer("D2", "C2", dec!(9.99)),
                transfer("D2", "C3", dec!(0.02)),
            ]
        );
        assert_eq!(plan.residual(), Decimal::ZERO);

        let tolerance = Tolerance::default();
        let after = apply_transfers(&input, plan.transfers());
        assert!(after.iter().all(|(_, net)| tolerance.is_zero(*net)));
    }

    #[test]
    fn test_member_never_sits_out_two_cent_moves() {
        let input = balances(&[
            ("D1", dec!(-0.99)),
            ("D2", dec!(-0.99)),
            ("D3", dec!(-0.49)),
            ("C1", dec!(1.00)),
            ("C2", dec!(0.97)),
            ("C3", dec!(0.50)),
        ]);
        let transfers = simplify(&input).unwrap();
        assert!(transfers.contains(&transfer("D2", "C3", dec!(0.01))));

        let tolerance = Tolerance::default();
        for (member, net) in apply_transfers(&input, &transfers) {
            assert!(tolerance.is_zero(net), "{} left with {}", member, net);
        }
    }

    #[test]
    fn test_exact_tolerance_remainder_keeps_cursor() {
        let input = balances(&[("A", dec!(-5.01)), ("B", dec!(5)), ("C", dec!(0.01))]);
        // C sits exactly on the boundary and is not a creditor.
        let plan = DebtSimplifier::default().plan(&input).unwrap();
        assert_eq!(plan.transfers(), &[transfer("A", "B", dec!(5))]);
        assert_eq!(plan.residual(), dec!(-0.01));
    }

    #[test]
    fn test_zero_tolerance_matches_everything() {
        let input = balances(&[("A", dec!(-0.015)), ("B", dec!(0.01)), ("C", dec!(0.005))]);
        let transfers = DebtSimplifier::new(Tolerance::new(Decimal::ZERO))
            .simplify(&input)
            .unwrap();
        assert_eq!(
            transfers,
            vec![transfer("A", "B", dec!(0.01)), transfer("A", "C", dec!(0.005))]
        );
    }

    #[test]
    fn test_wider_tolerance_drops_small_balances() {
        let input = balances(&[("A", dec!(-0.75)), ("B", dec!(0.75))]);
        let wide = DebtSimplifier::new(Tolerance::new(dec!(1)));
        assert!(wide.simplify(&input).unwrap().is_empty());
        assert_eq!(simplify(&input).unwrap().len(), 1);
    }

    #[test]
    fn test_into_new_settlement() {
        let new = transfer("B", "A", dec!(100))
            .into_new_settlement(GroupId::new("g"), MemberId::new("B"));
        assert_eq!(new.from.as_str(), "B");
        assert_eq!(new.to.as_str(), "A");
        assert_eq!(new.amount, dec!(100));
        assert!(new.note.is_none());
    }
}
