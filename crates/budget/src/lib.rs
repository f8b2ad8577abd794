//! Campaign budget accounting.
//!
//! Every model call in the system flows through [`BudgetLedger::record_usage`],
//! which converts token usage into dollars via the [`RateTable`] and drives the
//! two alerting thresholds: a one-shot warning when remaining funds dip below
//! the configured floor, and a repeated critical alert once the budget is gone.

mod ledger;
mod pricing;

pub use ledger::BudgetLedger;
pub use pricing::{ModelRate, RateTable};
