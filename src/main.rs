//! split-ledger CLI
//!
//! Compute balances and settle-up suggestions for an expense group.
//!
//! # Usage
//!
//! ```bash
//! # Per-member balances
//! split-ledger balances --input group.json
//!
//! # Balances shown in another currency
//! split-ledger balances --input group.json --display-currency EUR --rate 0.92
//!
//! # Suggested transfers, optionally recorded and re-checked
//! split-ledger settle --input group.json --format json
//! split-ledger settle --input group.json --apply
//!
//! # Generate a random group for testing
//! split-ledger generate --members 8 --expenses 40
//! ```
//!
//! Set `RUST_LOG=debug` for aggregation and simplification traces.

use log::error;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use split_ledger::config::LedgerConfig;
use split_ledger::core::balance::BalanceSheet;
use split_ledger::core::currency::CurrencyCode;
use split_ledger::core::member::{GroupId, MemberId};
use split_ledger::core::records::{
    decimal_from_f64, parse_amount, ExpensePayment, ExpenseSplit, RowKind, Settlement,
};
use split_ledger::ledger::aggregator::LedgerAggregator;
use split_ledger::optimization::simplifier::DebtSimplifier;
use split_ledger::presentation::currency::CurrencyPresenter;
use split_ledger::settlement::memory::{InMemoryDirectory, InMemorySettlementStore};
use split_ledger::settlement::ports::{MemberDirectory, SettlementStore};
use split_ledger::settlement::recorder::SettlementRecorder;
use split_ledger::simulation::group_generator::{generate_group, GroupConfig};
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"split-ledger — group expense balances and settle-up suggestions

USAGE:
    split-ledger <COMMAND> [OPTIONS]

COMMANDS:
    balances    Show every member's balance
    settle      Suggest transfers that settle the group
    generate    Generate a random group (for testing)
    help        Show this message

OPTIONS (balances, settle):
    --input <FILE>              Path to JSON group file
    --config <FILE>             Path to JSON ledger config
    --format <FORMAT>           Output format: text (default) or json

OPTIONS (balances):
    --display-currency <CODE>   Show balances in this currency
    --rate <RATE>               Ledger-to-display exchange rate

OPTIONS (settle):
    --apply                     Record the suggestions and show the result

OPTIONS (generate):
    --members <N>               Number of members (default: 6)
    --expenses <N>              Number of expenses (default: 20)
    --settlements <N>           Number of settlements (default: 3)
    --output <FILE>             Write to file instead of stdout

EXAMPLES:
    split-ledger balances --input trip.json
    split-ledger balances --input trip.json --display-currency EUR --rate 0.92
    split-ledger settle --input trip.json --format json
    split-ledger generate --members 10 --expenses 50 --output trip.json"#
    );
}

fn fail(message: impl std::fmt::Display) -> ! {
    error!("{}", message);
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// An amount given either as a decimal string or a JSON number.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Text(String),
    Number(f64),
}

impl AmountInput {
    fn to_decimal(&self, kind: RowKind, row: &str) -> Decimal {
        let parsed = match self {
            AmountInput::Text(s) => parse_amount(s, kind, row),
            AmountInput::Number(n) => decimal_from_f64(*n, kind, row),
        };
        parsed.unwrap_or_else(|e| fail(e))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PaymentInput {
    expense_id: String,
    payer: String,
    amount: AmountInput,
}

#[derive(Debug, Serialize, Deserialize)]
struct SplitInput {
    expense_id: String,
    member: String,
    share: AmountInput,
}

#[derive(Debug, Serialize, Deserialize)]
struct SettlementInput {
    from: String,
    to: String,
    amount: AmountInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

/// JSON schema for an input group.
#[derive(Debug, Serialize, Deserialize)]
struct GroupFile {
    #[serde(default = "default_group_id")]
    group_id: String,
    #[serde(default)]
    currency: Option<String>,
    members: Vec<String>,
    #[serde(default)]
    payments: Vec<PaymentInput>,
    #[serde(default)]
    splits: Vec<SplitInput>,
    #[serde(default)]
    settlements: Vec<SettlementInput>,
}

fn default_group_id() -> String {
    "group".to_string()
}

struct LoadedGroup {
    group_id: GroupId,
    currency: Option<CurrencyCode>,
    members: Vec<MemberId>,
    payments: Vec<ExpensePayment>,
    splits: Vec<ExpenseSplit>,
    settlements: Vec<Settlement>,
}

fn load_group(path: &str) -> LoadedGroup {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("reading file '{}': {}", path, e)));

    let file: GroupFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "group_id": "trip",
  "members": ["alice", "bob"],
  "payments": [{{ "expense_id": "e1", "payer": "alice", "amount": "80.00" }}],
  "splits": [{{ "expense_id": "e1", "member": "alice", "share": "40.00" }},
             {{ "expense_id": "e1", "member": "bob", "share": "40.00" }}],
  "settlements": [{{ "from": "bob", "to": "alice", "amount": "40.00" }}]
}}"#
        );
        fail(format!("parsing JSON: {}", e))
    });

    let group_id = GroupId::new(&file.group_id);
    let payments = file
        .payments
        .iter()
        .map(|p| {
            ExpensePayment::new(
                &p.expense_id,
                MemberId::new(&p.payer),
                p.amount.to_decimal(RowKind::Payment, &p.expense_id),
            )
        })
        .collect();
    let splits = file
        .splits
        .iter()
        .map(|s| {
            ExpenseSplit::new(
                &s.expense_id,
                MemberId::new(&s.member),
                s.share.to_decimal(RowKind::Split, &s.expense_id),
            )
        })
        .collect();
    let settlements = file
        .settlements
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let amount = s
                .amount
                .to_decimal(RowKind::Settlement, &format!("#{}", i));
            let settlement = Settlement::new(
                group_id.clone(),
                MemberId::new(&s.from),
                MemberId::new(&s.to),
                amount,
                MemberId::new(&s.from),
            );
            match &s.note {
                Some(note) => settlement.with_note(note),
                None => settlement,
            }
        })
        .collect();

    LoadedGroup {
        group_id,
        currency: file.currency.map(CurrencyCode::new),
        members: file.members.iter().map(MemberId::new).collect(),
        payments,
        splits,
        settlements,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Result<Self, String> {
        match value {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}': expected 'text' or 'json'", other)),
        }
    }
}

/// Options shared by `balances` and `settle`.
struct CommonOptions {
    input_path: String,
    format: OutputFormat,
    config: LedgerConfig,
    display_currency: Option<String>,
    rate: Option<Decimal>,
    apply: bool,
}

fn parse_common(args: &[String]) -> CommonOptions {
    let mut input_path = None;
    let mut config_path: Option<String> = None;
    let mut format = OutputFormat::Text;
    let mut display_currency = None;
    let mut rate = None;
    let mut apply = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--input requires a file path")),
                );
            }
            "--config" => {
                i += 1;
                config_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--config requires a file path")),
                );
            }
            "--format" => {
                i += 1;
                let value = args
                    .get(i)
                    .unwrap_or_else(|| fail("--format requires 'text' or 'json'"));
                format = OutputFormat::parse(value).unwrap_or_else(|e| fail(e));
            }
            "--display-currency" => {
                i += 1;
                display_currency = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--display-currency requires a code")),
                );
            }
            "--rate" => {
                i += 1;
                rate = Some(
                    args.get(i)
                        .and_then(|s| s.parse::<Decimal>().ok())
                        .unwrap_or_else(|| fail("--rate requires a decimal number")),
                );
            }
            "--apply" => apply = true,
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let input_path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let config = match config_path {
        Some(path) => LedgerConfig::from_json_file(&path).unwrap_or_else(|e| fail(e)),
        None => LedgerConfig::default(),
    };

    CommonOptions {
        input_path,
        format,
        config,
        display_currency,
        rate,
        apply,
    }
}

fn aggregate_group(group: &LoadedGroup, config: &LedgerConfig) -> BalanceSheet {
    LedgerAggregator::new(config.tolerance())
        .aggregate(&group.splits, &group.payments, &group.settlements, &group.members)
        .unwrap_or_else(|e| fail(e))
}

fn warn_if_unbalanced(sheet: &BalanceSheet) {
    if !sheet.is_balanced() {
        eprintln!(
            "Warning: balances sum to {} instead of zero; check the group's expense splits",
            sheet.imbalance()
        );
    }
}

#[derive(Serialize)]
struct BalancesOutput {
    group_id: String,
    currency: String,
    balanced: bool,
    imbalance: String,
    total_outstanding: String,
    balances: serde_json::Value,
}

fn cmd_balances(args: &[String]) {
    let opts = parse_common(args);
    let group = load_group(&opts.input_path);
    let sheet = aggregate_group(&group, &opts.config);
    warn_if_unbalanced(&sheet);

    let ledger_currency = group
        .currency
        .clone()
        .unwrap_or_else(|| opts.config.ledger_currency.clone());
    let display_currency = opts
        .display_currency
        .as_deref()
        .map(CurrencyCode::new)
        .unwrap_or_else(|| ledger_currency.clone());
    let rate = if display_currency == ledger_currency {
        Decimal::ONE
    } else {
        opts.rate
            .unwrap_or_else(|| fail("--rate is required when --display-currency differs"))
    };

    let presenter = CurrencyPresenter::new(opts.config.display_decimal_places);
    let presented: Vec<_> = sheet
        .iter()
        .map(|b| {
            presenter
                .present(b, &ledger_currency, &display_currency, rate)
                .unwrap_or_else(|e| fail(e))
        })
        .collect();

    if opts.format == OutputFormat::Json {
        let output = BalancesOutput {
            group_id: group.group_id.to_string(),
            currency: display_currency.to_string(),
            balanced: sheet.is_balanced(),
            imbalance: sheet.imbalance().to_string(),
            total_outstanding: sheet.total_outstanding().to_string(),
            balances: serde_json::to_value(&presented).unwrap_or_else(|e| fail(e)),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_else(|e| fail(e))
        );
    } else {
        println!("Group: {} ({})", group.group_id, ledger_currency);
        println!("{}", sheet);
        if display_currency != ledger_currency {
            println!("=== In {} ===", display_currency);
            for p in &presented {
                println!("  {}", p);
            }
        }
    }
}

#[derive(Serialize)]
struct SettleOutput {
    group_id: String,
    balanced: bool,
    transfers: serde_json::Value,
    residual: String,
    applied: bool,
    settled_after_apply: Option<bool>,
}

fn cmd_settle(args: &[String]) {
    let opts = parse_common(args);
    let group = load_group(&opts.input_path);
    let sheet = aggregate_group(&group, &opts.config);
    warn_if_unbalanced(&sheet);

    let plan = DebtSimplifier::simplify_sheet(&sheet).unwrap_or_else(|e| fail(e));

    let mut settled_after_apply = None;
    let mut after_sheet = None;
    if opts.apply && !plan.is_empty() {
        let mut directory = InMemoryDirectory::new();
        directory.add_group(group.group_id.clone(), group.members.iter().cloned());
        let store = InMemorySettlementStore::new();
        store
            .insert_batch(group.settlements.clone())
            .unwrap_or_else(|e| fail(e));
        let recorder = SettlementRecorder::new(directory, store);

        let batch = plan
            .transfers()
            .iter()
            .cloned()
            .map(|t| {
                let created_by = t.from.clone();
                t.into_new_settlement(group.group_id.clone(), created_by)
            })
            .collect();
        recorder.record_batch(batch).unwrap_or_else(|e| fail(e));

        let settlements = recorder
            .store()
            .list(&group.group_id)
            .unwrap_or_else(|e| fail(e));
        let roster = recorder
            .directory()
            .members(&group.group_id)
            .unwrap_or_else(|e| fail(e));
        let after = LedgerAggregator::new(opts.config.tolerance())
            .aggregate(&group.splits, &group.payments, &settlements, &roster)
            .unwrap_or_else(|e| fail(e));
        settled_after_apply = Some(after.iter().all(|b| b.is_settled()));
        after_sheet = Some(after);
    }

    if opts.format == OutputFormat::Json {
        let output = SettleOutput {
            group_id: group.group_id.to_string(),
            balanced: sheet.is_balanced(),
            transfers: serde_json::to_value(plan.transfers()).unwrap_or_else(|e| fail(e)),
            residual: plan.residual().to_string(),
            applied: after_sheet.is_some(),
            settled_after_apply,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_else(|e| fail(e))
        );
    } else {
        println!("{}", sheet);
        println!("{}", plan);
        if let Some(after) = after_sheet {
            println!("=== After recording suggestions ===");
            println!("{}", after);
        }
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = GroupConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--members" => {
                i += 1;
                config.member_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--members requires a number"));
            }
            "--expenses" => {
                i += 1;
                config.expense_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--expenses requires a number"));
            }
            "--settlements" => {
                i += 1;
                config.settlement_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--settlements requires a number"));
            }
            "--output" => {
                i += 1;
                output_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--output requires a file path")),
                );
            }
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let group = generate_group(&config);
    let file = GroupFile {
        group_id: group.group_id.to_string(),
        currency: None,
        members: group.members.iter().map(|m| m.to_string()).collect(),
        payments: group
            .payments
            .iter()
            .map(|p| PaymentInput {
                expense_id: p.expense_id.clone(),
                payer: p.payer_id.to_string(),
                amount: AmountInput::Text(p.amount.to_string()),
            })
            .collect(),
        splits: group
            .splits
            .iter()
            .map(|s| SplitInput {
                expense_id: s.expense_id.clone(),
                member: s.member_id.to_string(),
                share: AmountInput::Text(s.share_amount.to_string()),
            })
            .collect(),
        settlements: group
            .settlements
            .iter()
            .map(|s| SettlementInput {
                from: s.from().to_string(),
                to: s.to().to_string(),
                amount: AmountInput::Text(s.amount().to_string()),
                note: s.note().map(str::to_string),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&file).unwrap_or_else(|e| fail(e));

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| fail(format!("writing '{}': {}", path, e)));
        eprintln!(
            "Generated {} expenses across {} members → {}",
            group.payments.len(),
            group.members.len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "balances" => cmd_balances(rest),
        "settle" => cmd_settle(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
