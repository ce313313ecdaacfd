//! A weekend trip: three expenses, four friends, and the shortest way to
//! square up.

use split_ledger::core::currency::{CurrencyCode, FxRateTable};
use split_ledger::core::member::MemberId;
use split_ledger::core::records::{ExpensePayment, ExpenseSplit};
use split_ledger::ledger::aggregator::aggregate;
use split_ledger::optimization::simplifier::DebtSimplifier;
use split_ledger::presentation::currency::CurrencyPresenter;
use rust_decimal_macros::dec;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  split-ledger: Weekend Trip Example      ║");
    println!("╚══════════════════════════════════════════╝\n");

    let ana = MemberId::new("ana");
    let ben = MemberId::new("ben");
    let chloe = MemberId::new("chloe");
    let dev = MemberId::new("dev");
    let members = vec![ana.clone(), ben.clone(), chloe.clone(), dev.clone()];

    // --- Expenses ---
    println!("━━━ Expenses ━━━\n");

    let payments = vec![
        ExpensePayment::new("cabin", ana.clone(), dec!(480)),
        ExpensePayment::new("groceries", ben.clone(), dec!(126.40)),
        ExpensePayment::new("fuel", chloe.clone(), dec!(90)),
    ];

    // Cabin split four ways, groceries three ways (dev skipped them),
    // fuel between the two drivers.
    let mut splits: Vec<ExpenseSplit> = members
        .iter()
        .map(|m| ExpenseSplit::new("cabin", m.clone(), dec!(120)))
        .collect();
    splits.push(ExpenseSplit::new("groceries", ana.clone(), dec!(42.14)));
    splits.push(ExpenseSplit::new("groceries", ben.clone(), dec!(42.13)));
    splits.push(ExpenseSplit::new("groceries", chloe.clone(), dec!(42.13)));
    splits.push(ExpenseSplit::new("fuel", chloe.clone(), dec!(45)));
    splits.push(ExpenseSplit::new("fuel", dev.clone(), dec!(45)));

    for payment in &payments {
        println!("  {:<10} paid by {:<6} {:>8}", payment.expense_id, payment.payer_id, payment.amount);
    }
    println!();

    // --- Balances ---
    println!("━━━ Balances ━━━\n");

    let sheet = match aggregate(&splits, &payments, &[], &members) {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("ledger error: {}", e);
            return;
        }
    };
    println!("{}", sheet);

    // --- Suggested transfers ---
    let plan = match DebtSimplifier::simplify_sheet(&sheet) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("simplifier error: {}", e);
            return;
        }
    };
    println!("{}", plan);
    println!(
        "{} transfers instead of up to {}\n",
        plan.transfers().len(),
        plan.transfer_bound()
    );

    // --- Display in another currency ---
    println!("━━━ Balances in EUR (display only) ━━━\n");

    let usd = CurrencyCode::new("USD");
    let eur = CurrencyCode::new("EUR");
    let mut rates = FxRateTable::new();
    if let Err(e) = rates.set_rate(usd.clone(), eur.clone(), dec!(0.92)) {
        eprintln!("rate error: {}", e);
        return;
    }
    let presenter = CurrencyPresenter::default();
    for balance in sheet.iter() {
        match presenter.present_with(balance, &usd, &eur, &rates) {
            Ok(presented) => println!("  {}", presented),
            Err(e) => eprintln!("  {}: {}", balance.member_id(), e),
        }
    }
}
