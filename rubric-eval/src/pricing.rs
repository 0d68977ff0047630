//! Model pricing for cost estimates

use rubric_core::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self { input_per_million, output_per_million }
    }

    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.prompt_tokens as f64 * self.input_per_million
            + usage.completion_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

const BUILTIN: &[(&str, ModelPricing)] = &[
    ("gpt-4.1", ModelPricing::new(2.0, 8.0)),
    ("gpt-4.1-mini", ModelPricing::new(0.4, 1.6)),
    ("gpt-4.1-nano", ModelPricing::new(0.1, 0.4)),
    ("gpt-4o", ModelPricing::new(2.5, 10.0)),
    ("gpt-4o-mini", ModelPricing::new(0.15, 0.6)),
    ("o1", ModelPricing::new(15.0, 60.0)),
    ("o3", ModelPricing::new(2.0, 8.0)),
    ("o3-mini", ModelPricing::new(1.1, 4.4)),
    ("o4-mini", ModelPricing::new(1.1, 4.4)),
    ("claude-3-5-haiku", ModelPricing::new(0.8, 4.0)),
    ("claude-3-7-sonnet", ModelPricing::new(3.0, 15.0)),
    ("claude-sonnet-4", ModelPricing::new(3.0, 15.0)),
    ("claude-opus-4", ModelPricing::new(15.0, 75.0)),
    ("gemini-2.0-flash", ModelPricing::new(0.1, 0.4)),
    ("gemini-2.5-flash", ModelPricing::new(0.3, 2.5)),
    ("gemini-2.5-pro", ModelPricing::new(1.25, 10.0)),
];

/// Price lookup keyed by model name
#[derive(Debug, Clone)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            models: BUILTIN.iter().map(|(name, pricing)| (name.to_string(), *pricing)).collect(),
        }
    }
}

impl PricingTable {
    pub fn empty() -> Self {
        Self { models: HashMap::new() }
    }

    pub fn with_model(mut self, name: &str, pricing: ModelPricing) -> Self {
        self.models.insert(name.to_ascii_lowercase(), pricing);
        self
    }

    /// Find pricing by exact name, then by the longest registered prefix.
    ///
    /// Case-insensitive. A leading `provider/` segment is ignored, so
    /// `openai/gpt-4o-2024-08-06` resolves to `gpt-4o`.
    pub fn lookup(&self, model: &str) -> Option<&ModelPricing> {
        let name = model.rsplit_once('/').map_or(model, |(_, name)| name).to_ascii_lowercase();
        if let Some(pricing) = self.models.get(&name) {
            return Some(pricing);
        }
        self.models
            .iter()
            .filter(|(key, _)| name.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, pricing)| pricing)
    }

    pub fn estimate_cost(&self, model: &str, usage: &TokenUsage) -> Option<f64> {
        self.lookup(model).map(|pricing| pricing.cost(usage))
    }
}
