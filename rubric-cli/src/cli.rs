use clap::{Args, Parser, Subcommand};
use rubric_core::ReasoningEffort;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rubric-bench")]
#[command(about = "Rubric-graded benchmark runner for chat models", long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Export spans to an OTLP collector (e.g. http://localhost:4317)
    #[arg(long, global = true)]
    pub otlp_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a model against a rubric dataset
    Run(RunArgs),

    /// Print the summary of a saved report
    Show {
        /// Path to a report JSON file
        report: PathBuf,
    },
}

/// Flags for `run`. Unset flags fall back to the config file, then defaults.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Dataset file (JSONL)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Model under test
    #[arg(short, long)]
    pub model: Option<String>,

    /// Grader model
    #[arg(short, long)]
    pub grader: Option<String>,

    /// Evaluate at most this many examples, sampled at random
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Sampling seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Grader calls in flight per example
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Reasoning effort for the model under test
    #[arg(long, value_parser = parse_effort)]
    pub reasoning_effort: Option<ReasoningEffort>,

    /// Directory reports are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Settings file (defaults to ./rubric-bench.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_effort(value: &str) -> Result<ReasoningEffort, String> {
    value.parse().map_err(|e: rubric_core::RubricError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "rubric-bench",
            "run",
            "--dataset",
            "hard.jsonl",
            "--model",
            "gpt-4.1-mini",
            "--limit",
            "20",
            "--seed",
            "7",
            "--reasoning-effort",
            "high",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.dataset, Some(PathBuf::from("hard.jsonl")));
        assert_eq!(args.model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(args.limit, Some(20));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.reasoning_effort, Some(ReasoningEffort::High));
        assert!(args.grader.is_none());
    }

    #[test]
    fn test_rejects_unknown_effort() {
        let result = Cli::try_parse_from(["rubric-bench", "run", "--reasoning-effort", "extreme"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_show_with_global_flag() {
        let cli = Cli::try_parse_from(["rubric-bench", "show", "out.json", "--json-logs"]).unwrap();
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Show { ref report } if report == &PathBuf::from("out.json")));
    }
}
