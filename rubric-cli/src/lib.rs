//! # rubric-cli
//!
//! The `rubric-bench` command line.
//!
//! - `rubric-bench run` evaluates a model against a JSONL rubric dataset and
//!   saves a JSON report.
//! - `rubric-bench show` prints the summary of a saved report.
//!
//! Settings come from built-in defaults, then `rubric-bench.toml` (or
//! `--config`), then flags. API keys are read from `OPENAI_API_KEY`, with
//! `GRADER_API_KEY`/`GRADER_BASE_URL` optionally pointing the grader
//! elsewhere.

pub mod cli;
pub mod config;
pub mod runner;

pub use cli::{Cli, Commands, RunArgs};
pub use config::{Credentials, Endpoint, RunSettings};
