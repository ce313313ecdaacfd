//! Record suggested transfers as settlements and watch the group settle.

use split_ledger::core::member::{GroupId, MemberId};
use split_ledger::core::records::{ExpensePayment, ExpenseSplit, NewSettlement};
use split_ledger::ledger::aggregator::aggregate;
use split_ledger::optimization::simplifier::simplify;
use split_ledger::settlement::memory::{InMemoryDirectory, InMemorySettlementStore};
use split_ledger::settlement::ports::SettlementStore;
use split_ledger::settlement::recorder::SettlementRecorder;
use rust_decimal_macros::dec;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  split-ledger: Recording Settlements     ║");
    println!("╚══════════════════════════════════════════╝\n");

    let group = GroupId::new("flat-42");
    let a = MemberId::new("A");
    let b = MemberId::new("B");
    let c = MemberId::new("C");
    let members = vec![a.clone(), b.clone(), c.clone()];

    let payments = vec![ExpensePayment::new("rent", a.clone(), dec!(300))];
    let splits: Vec<ExpenseSplit> = members
        .iter()
        .map(|m| ExpenseSplit::new("rent", m.clone(), dec!(100)))
        .collect();

    let mut directory = InMemoryDirectory::new();
    directory.add_group(group.clone(), members.clone());
    let recorder = SettlementRecorder::new(directory, InMemorySettlementStore::new());

    // --- Rejected input ---
    println!("━━━ Validation ━━━\n");

    let attempts = vec![
        NewSettlement::new(group.clone(), b.clone(), b.clone(), dec!(10), b.clone()),
        NewSettlement::new(group.clone(), b.clone(), a.clone(), dec!(-5), b.clone()),
        NewSettlement::new(group.clone(), b.clone(), MemberId::new("Z"), dec!(10), b.clone()),
    ];
    for attempt in attempts {
        match recorder.record(attempt) {
            Ok(s) => println!("  unexpectedly recorded {}", s.id()),
            Err(e) => println!("  rejected: {}", e),
        }
    }
    println!();

    // --- One manual settlement ---
    println!("━━━ B pays A 40 ━━━\n");

    let manual = NewSettlement::new(group.clone(), b.clone(), a.clone(), dec!(40), b.clone())
        .with_note("cash at the pub");
    if let Err(e) = recorder.record(manual) {
        eprintln!("record failed: {}", e);
        return;
    }

    let settlements = match recorder.store().list(&group) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("store error: {}", e);
            return;
        }
    };
    let sheet = match aggregate(&splits, &payments, &settlements, &members) {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("ledger error: {}", e);
            return;
        }
    };
    println!("{}", sheet);

    // --- Accept every suggestion in one batch ---
    println!("━━━ Settle up ━━━\n");

    let transfers = match simplify(sheet.balances()) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("simplifier error: {}", e);
            return;
        }
    };
    for t in &transfers {
        println!("  {}", t);
    }
    let batch = transfers
        .into_iter()
        .map(|t| {
            let created_by = t.from.clone();
            t.into_new_settlement(group.clone(), created_by)
        })
        .collect();
    if let Err(e) = recorder.record_batch(batch) {
        eprintln!("batch failed: {}", e);
        return;
    }

    let settlements = recorder.store().list(&group).unwrap_or_default();
    match aggregate(&splits, &payments, &settlements, &members) {
        Ok(after) => {
            println!();
            println!("{}", after);
            println!("Settled: {}", after.iter().all(|b| b.is_settled()));
        }
        Err(e) => eprintln!("ledger error: {}", e),
    }
}
