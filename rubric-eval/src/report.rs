//! Evaluation result reporting
//!
//! Per-example result records, and the JSON report persisted at the end
//! of a run.

use crate::error::{EvalError, Result};
use crate::pricing::PricingTable;
use crate::scoring::ThemeScore;
use crate::state::RunState;
use chrono::{DateTime, SecondsFormat, Utc};
use rubric_core::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Grader verdict for one rubric item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricResult {
    pub criterion: String,
    pub points: f64,
    pub criteria_met: bool,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Outcome of one dataset example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleResult {
    pub prompt_id: String,
    pub model_response: String,
    /// In rubric order
    pub rubric_results: Vec<RubricResult>,
    pub achieved_points: f64,
    pub total_points: f64,
    pub score: f64,
}

impl ExampleResult {
    /// Zero-scored stand-in for an example that failed mid-run.
    pub fn placeholder(prompt_id: impl Into<String>) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            model_response: String::new(),
            rubric_results: Vec::new(),
            achieved_points: 0.0,
            total_points: 1.0,
            score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub response: TokenUsage,
    pub grading: TokenUsage,
    pub total: TokenUsage,
}

/// Estimated spend in USD; `None` where a model has no known price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub response_usd: Option<f64>,
    pub grading_usd: Option<f64>,
    pub total_usd: Option<f64>,
}

/// Time spent per phase, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub response_ms: u64,
    pub grading_ms: u64,
    pub wall_clock_ms: u64,
}

/// Persisted summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model: String,
    pub grader_model: String,
    pub dataset: String,
    pub timestamp: DateTime<Utc>,
    pub overall_score: f64,
    pub std_dev: f64,
    pub num_examples: usize,
    pub error_count: usize,
    pub last_error: Option<String>,
    pub tokens: TokenTotals,
    pub cost: CostEstimate,
    pub timing: Timing,
    #[serde(default)]
    pub theme_scores: BTreeMap<String, ThemeScore>,
    pub examples: Vec<ExampleResult>,
}

impl EvaluationReport {
    /// Build a report from the final run snapshot.
    pub fn from_state(state: &RunState, pricing: &PricingTable) -> Self {
        let timestamp = state.finished_at.unwrap_or_else(Utc::now);
        let wall_clock_ms = state
            .started_at
            .map(|started| (timestamp - started).num_milliseconds().max(0) as u64)
            .unwrap_or_default();

        let response_usd = pricing.estimate_cost(&state.model, &state.response_tokens);
        let grading_usd = pricing.estimate_cost(&state.grader_model, &state.grading_tokens);
        let total_usd = response_usd.zip(grading_usd).map(|(r, g)| r + g);

        Self {
            model: state.model.clone(),
            grader_model: state.grader_model.clone(),
            dataset: state.dataset.clone(),
            timestamp,
            overall_score: state.overall_score,
            std_dev: state.std_dev,
            num_examples: state.results.len(),
            error_count: state.error_count,
            last_error: state.last_error.clone(),
            tokens: TokenTotals {
                response: state.response_tokens,
                grading: state.grading_tokens,
                total: state.response_tokens + state.grading_tokens,
            },
            cost: CostEstimate { response_usd, grading_usd, total_usd },
            timing: Timing {
                response_ms: state.response_time.as_millis() as u64,
                grading_ms: state.grading_time.as_millis() as u64,
                wall_clock_ms,
            },
            theme_scores: state.theme_scores.clone(),
            examples: state.results.clone(),
        }
    }

    /// File name the report is saved under.
    pub fn file_name(&self) -> String {
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        format!("{}_{}_{}.json", sanitize(&self.model), sanitize(&self.dataset), sanitize(&timestamp))
    }

    /// Write the report as pretty JSON into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "saved evaluation report");
        Ok(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::LoadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Export to JSON
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Format as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Evaluation Report: {} on {}\n", self.model, self.dataset));
        output.push_str(&format!("Grader: {}\n", self.grader_model));
        output.push_str(&format!("Timestamp: {}\n", self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)));
        output.push_str("\nSummary:\n");
        output.push_str(&format!("  Examples: {}\n", self.num_examples));
        output.push_str(&format!("  Overall Score: {:.3}\n", self.overall_score));
        output.push_str(&format!("  Std Dev: {:.3}\n", self.std_dev));
        output.push_str(&format!("  Errors: {}\n", self.error_count));
        if let Some(last_error) = &self.last_error {
            output.push_str(&format!("  Last Error: {}\n", last_error));
        }

        if !self.theme_scores.is_empty() {
            output.push_str("\nTheme Scores:\n");
            for theme in self.theme_scores.values() {
                output.push_str(&format!(
                    "  {}: {:.3} ({} examples)\n",
                    theme.theme, theme.avg_score, theme.examples
                ));
            }
        }

        output.push_str("\nTokens:\n");
        output.push_str(&format!("  Response: {}\n", self.tokens.response.total_tokens));
        output.push_str(&format!("  Grading: {}\n", self.tokens.grading.total_tokens));
        output.push_str(&format!("  Total: {}\n", self.tokens.total.total_tokens));

        if let Some(total) = self.cost.total_usd {
            output.push_str(&format!("\nEstimated Cost: ${:.4}\n", total));
        }

        output.push_str(&format!(
            "\nTiming: response {:.1}s, grading {:.1}s, wall clock {:.1}s\n",
            self.timing.response_ms as f64 / 1000.0,
            self.timing.grading_ms as f64 / 1000.0,
            self.timing.wall_clock_ms as f64 / 1000.0
        ));

        output
    }
}

fn sanitize(part: &str) -> String {
    part.chars().map(|c| if c == '/' || c == ':' { '-' } else { c }).collect()
}
