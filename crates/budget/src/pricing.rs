//! Per-model token pricing.

use std::collections::HashMap;
use std::sync::RwLock;

/// USD per million tokens, split by direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub input_per_m: f64,
    pub output_per_m: f64,
}

impl ModelRate {
    pub const fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Dollar cost of a single call.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_per_m
            + (output_tokens as f64 / 1_000_000.0) * self.output_per_m
    }
}

/// Pricing for every model the gateway routes to.
///
/// Unknown models fall back to the `"default"` rate so a newly added model
/// is charged conservatively instead of for free.
pub struct RateTable {
    rates: RwLock<HashMap<String, ModelRate>>,
}

impl RateTable {
    pub fn new() -> Self {
        Self {
            rates: RwLock::new(HashMap::new()),
        }
    }

    /// Table preloaded with the routed models and a catch-all default.
    pub fn with_defaults() -> Self {
        let table = Self::new();
        table.set("anthropic/claude-3-haiku-20240307", ModelRate::new(0.25, 1.25));
        table.set("google/gemini-pro", ModelRate::new(0.50, 1.50));
        table.set("openai/gpt-4-turbo", ModelRate::new(10.00, 30.00));
        table.set("google/gemini-1.5-flash-latest", ModelRate::new(0.075, 0.30));
        table.set("default", ModelRate::new(1.00, 3.00));
        table
    }

    pub fn get(&self, model: &str) -> Option<ModelRate> {
        self.rates.read().unwrap().get(model).copied()
    }

    pub fn set(&self, model: &str, rate: ModelRate) {
        self.rates.write().unwrap().insert(model.to_string(), rate);
    }

    /// Cost of a call, using the default rate when the model is unpriced.
    pub fn compute_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let rates = self.rates.read().unwrap();
        let rate = rates
            .get(model)
            .or_else(|| rates.get("default"))
            .copied()
            .unwrap_or(ModelRate::new(1.00, 3.00));
        rate.cost(input_tokens, output_tokens)
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
