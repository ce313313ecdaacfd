//! Random expense groups for benchmarks and property tests.
//!
//! Every generated expense is split to the cent, so the rows always
//! aggregate to a zero-sum ledger.

use crate::core::member::{GroupId, MemberId};
use crate::core::records::{ExpensePayment, ExpenseSplit, Settlement};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;

/// Configuration for generating a random group.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Number of members in the group.
    pub member_count: usize,
    /// Number of expenses to record.
    pub expense_count: usize,
    /// Number of settlements to record.
    pub settlement_count: usize,
    /// Smallest expense, in cents.
    pub min_amount_cents: i64,
    /// Largest expense, in cents.
    pub max_amount_cents: i64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            member_count: 6,
            expense_count: 20,
            settlement_count: 3,
            min_amount_cents: 100,
            max_amount_cents: 50_000,
        }
    }
}

/// Rows of one generated group.
#[derive(Debug, Clone)]
pub struct GeneratedGroup {
    pub group_id: GroupId,
    pub members: Vec<MemberId>,
    pub payments: Vec<ExpensePayment>,
    pub splits: Vec<ExpenseSplit>,
    pub settlements: Vec<Settlement>,
}

/// Generate a random group using the thread-local RNG.
pub fn generate_group(config: &GroupConfig) -> GeneratedGroup {
    generate_group_with_rng(config, &mut rand::thread_rng())
}

/// Generate a random group from a caller-supplied RNG (seed it for
/// reproducible runs).
pub fn generate_group_with_rng<R: Rng>(config: &GroupConfig, rng: &mut R) -> GeneratedGroup {
    let group_id = GroupId::new("GROUP-RANDOM");
    let members: Vec<MemberId> = (0..config.member_count)
        .map(|i| MemberId::new(format!("MEMBER-{:03}", i)))
        .collect();

    let mut payments = Vec::new();
    let mut splits = Vec::new();
    let mut settlements = Vec::new();

    if members.is_empty() {
        return GeneratedGroup {
            group_id,
            members,
            payments,
            splits,
            settlements,
        };
    }

    let min_cents = config.min_amount_cents.max(1);
    let max_cents = config.max_amount_cents.max(min_cents);

    for e in 0..config.expense_count {
        let expense_id = format!("EXP-{:04}", e);
        let cents = rng.gen_range(min_cents..=max_cents);
        let payer = members[rng.gen_range(0..members.len())].clone();

        let participant_count = rng.gen_range(1..=members.len());
        let participants: Vec<&MemberId> =
            members.choose_multiple(rng, participant_count).collect();

        payments.push(ExpensePayment::new(
            expense_id.clone(),
            payer,
            Decimal::new(cents, 2),
        ));

        // Spread the leftover cents over the first participants.
        let count = participants.len() as i64;
        let base = cents / count;
        let leftover = cents % count;
        for (k, member) in participants.into_iter().enumerate() {
            let share = base + i64::from((k as i64) < leftover);
            splits.push(ExpenseSplit::new(
                expense_id.clone(),
                member.clone(),
                Decimal::new(share, 2),
            ));
        }
    }

    if members.len() > 1 {
        for _ in 0..config.settlement_count {
            let from_idx = rng.gen_range(0..members.len());
            let mut to_idx = rng.gen_range(0..members.len());
            while to_idx == from_idx {
                to_idx = rng.gen_range(0..members.len());
            }
            let cents = rng.gen_range(min_cents..=max_cents);
            settlements.push(Settlement::new(
                group_id.clone(),
                members[from_idx].clone(),
                members[to_idx].clone(),
                Decimal::new(cents, 2),
                members[from_idx].clone(),
            ));
        }
    }

    GeneratedGroup {
        group_id,
        members,
        payments,
        splits,
        settlements,
    }
}
