//! The campaign spend ledger.

use std::sync::{Arc, RwLock};

use emberline_core::Alerter;
use tracing::{info, warn};

use crate::pricing::RateTable;

struct LedgerState {
    spent: f64,
    remaining: f64,
    warn_sent: bool,
}

/// Tracks cumulative model spend against a fixed campaign budget.
///
/// The warning alert is edge-triggered: it fires once when remaining funds
/// first drop below the threshold and stays latched until [`reset`] restores
/// headroom. The critical alert fires on every recording once the budget is
/// fully exhausted.
///
/// [`reset`]: BudgetLedger::reset
pub struct BudgetLedger {
    rates: RateTable,
    state: RwLock<LedgerState>,
    warn_threshold: f64,
    alerter: Arc<dyn Alerter>,
}

impl BudgetLedger {
    pub fn new(initial: f64, warn_threshold: f64, rates: RateTable, alerter: Arc<dyn Alerter>) -> Self {
        Self {
            rates,
            state: RwLock::new(LedgerState {
                spent: 0.0,
                remaining: initial,
                warn_sent: false,
            }),
            warn_threshold,
            alerter,
        }
    }

    /// Charge one model call against the budget, returning its cost.
    pub async fn record_usage(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let cost = self.rates.compute_cost(model, input_tokens, output_tokens);

        // Alert decisions are made inside the lock, alerts sent outside it.
        let (warn_now, critical_now, remaining) = {
            let mut state = self.state.write().unwrap();
            state.spent += cost;
            state.remaining -= cost;

            let critical = state.remaining <= 0.0;
            let warn = !critical && !state.warn_sent && state.remaining < self.warn_threshold;
            if warn {
                state.warn_sent = true;
            }
            (warn, critical, state.remaining)
        };

        info!(model, cost, remaining, "recorded model usage");

        if critical_now {
            warn!(remaining, "campaign budget exhausted");
            self.alerter
                .alert(&format!(
                    "CRITICAL: campaign budget exhausted (remaining ${remaining:.2})"
                ))
                .await;
        } else if warn_now {
            warn!(remaining, threshold = self.warn_threshold, "budget warning threshold crossed");
            self.alerter
                .alert(&format!(
                    "WARNING: campaign budget low, ${remaining:.2} remaining"
                ))
                .await;
        }

        cost
    }

    pub fn remaining(&self) -> f64 {
        self.state.read().unwrap().remaining
    }

    pub fn spent(&self) -> f64 {
        self.state.read().unwrap().spent
    }

    /// Replace the remaining budget, e.g. when a campaign is topped up.
    /// Clears the warning latch if the new amount restores headroom.
    pub fn reset(&self, amount: f64) {
        let mut state = self.state.write().unwrap();
        state.remaining = amount;
        state.spent = 0.0;
        if amount > self.warn_threshold {
            state.warn_sent = false;
        }
    }

    /// Whether a new discovery cycle may start. Cycles are skipped once
    /// remaining funds fall to half the warning threshold, leaving room for
    /// in-flight work to finish.
    pub fn allows_cycle(&self) -> bool {
        self.remaining() > self.warn_threshold / 2.0
    }
}
