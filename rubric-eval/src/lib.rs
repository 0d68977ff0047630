//! # rubric-eval
//!
//! Rubric-based evaluation engine for chat models.
//!
//! Each dataset example carries a conversation and a list of weighted
//! criteria. The engine asks the model under test for a reply, has a
//! grader model judge every criterion independently, and aggregates the
//! points into per-example, per-theme and overall scores.
//!
//! ## Features
//!
//! - **Dataset**: JSONL loader with seeded sampling
//! - **Grading**: one judge call per criterion, tolerant JSON parsing
//! - **Bounded concurrency**: grader calls fan out in fixed-size chunks
//! - **Live state**: immutable snapshots pushed to any observer
//! - **Reports**: JSON persistence with token, cost and timing totals
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rubric_eval::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = Arc::new(create_model()?);
//!     let grader = Grader::new(Arc::new(create_grader()?));
//!
//!     let dataset = Dataset::load_jsonl("hard_subset.jsonl")?.sample(Some(50), Some(42));
//!     let evaluator = Evaluator::new(EvaluationConfig::default(), model, grader);
//!     let state = evaluator.run(&dataset).await?;
//!
//!     let report = EvaluationReport::from_state(&state, &PricingTable::default());
//!     println!("{}", report.format_summary());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod evaluator;
pub mod grader;
pub mod pricing;
pub mod report;
pub mod scheduler;
pub mod schema;
pub mod scoring;
pub mod state;

// Re-exports
pub use error::{EvalError, Result};
pub use evaluator::{EvaluationConfig, Evaluator};
pub use grader::{GradeOutcome, Grader, GraderConfig, GraderVerdict, parse_grader_response};
pub use pricing::{ModelPricing, PricingTable};
pub use report::{EvaluationReport, ExampleResult, RubricResult};
pub use scheduler::{ChunkProgress, GradingOutcome, GradingScheduler, GradingUpdate};
pub use schema::{Dataset, Example, RubricItem};
pub use scoring::{
    ExampleScore, OverallScore, ThemeScore, calculate_example_score, calculate_overall_score,
    update_theme_scores,
};
pub use state::{
    CurrentExample, ExampleStage, RunEvent, RunPhase, RunState, StateSink, channel_sink,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{EvalError, Result};
    pub use crate::evaluator::{EvaluationConfig, Evaluator};
    pub use crate::grader::{Grader, GraderConfig};
    pub use crate::pricing::PricingTable;
    pub use crate::report::{EvaluationReport, ExampleResult, RubricResult};
    pub use crate::schema::{Dataset, Example, RubricItem};
    pub use crate::state::{RunPhase, RunState, StateSink, channel_sink};
}
