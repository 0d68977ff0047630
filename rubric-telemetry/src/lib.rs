//! # rubric-telemetry
//!
//! Structured logging and tracing for benchmark runs.
//!
//! ## Features
//! - Structured logging with `tracing`
//! - Optional JSON log output for machine consumption
//! - OpenTelemetry OTLP export of run, example and grading spans
//!
//! ## Usage
//!
//! ```rust
//! use rubric_telemetry::{init_telemetry, info};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("rubric-bench")?;
//!     info!("starting run");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

pub use init::{LogFormat, init_telemetry, init_with_format, init_with_otlp, shutdown_telemetry};
pub use spans::*;
