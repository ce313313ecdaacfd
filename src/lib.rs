//! # split-ledger
//!
//! Balance ledger and settle-up engine for shared-expense groups.
//!
//! Given the expenses recorded in a group (who paid, how each cost was
//! split) and the settlements members have already made, this crate derives
//! every member's net position and proposes a short list of transfers that
//! would bring everyone back to zero.
//!
//! ## Architecture
//!
//! - **core** — Value types: members, currencies, ledger rows, balances
//! - **ledger** — Aggregation of raw rows into per-member balances
//! - **optimization** — Greedy debt simplification
//! - **settlement** — Validation and atomic recording of new settlements
//! - **presentation** — Read-only conversion of balances into a display currency
//! - **simulation** — Random group generation for benchmarks and tests
//!
//! Balances and suggestions are pure functions of the rows they are built
//! from. Nothing is cached between calls; after recording a settlement,
//! re-read the rows and aggregate again.

pub mod config;
pub mod core;
pub mod ledger;
pub mod optimization;
pub mod presentation;
pub mod settlement;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::LedgerConfig;
    pub use crate::core::balance::{Balance, BalanceSheet, Tolerance};
    pub use crate::core::currency::{CurrencyCode, ExchangeRateSource, FxRateTable};
    pub use crate::core::member::{GroupId, MemberId};
    pub use crate::core::records::{
        ExpensePayment, ExpenseSplit, LedgerError, NewSettlement, Settlement,
    };
    pub use crate::ledger::aggregator::{aggregate, LedgerAggregator};
    pub use crate::optimization::simplifier::{
        simplify, DebtSimplifier, SettlementPlan, SimplifyError, SuggestedTransfer,
    };
    pub use crate::presentation::currency::{present, CurrencyPresenter, PresentedBalance};
    pub use crate::settlement::ports::{MemberDirectory, SettlementStore, StoreError};
    pub use crate::settlement::recorder::{SettlementError, SettlementRecorder};
}
