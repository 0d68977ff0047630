use anyhow::{Result, anyhow};
use clap::Parser;
use rubric_cli::config::{Credentials, RunSettings};
use rubric_cli::runner;
use rubric_cli::{Cli, Commands};
use rubric_telemetry::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.otlp_endpoint {
        Some(endpoint) => rubric_telemetry::init_with_otlp("rubric-bench", endpoint),
        None => {
            let format = if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty };
            rubric_telemetry::init_with_format("rubric-bench", format)
        }
    }
    .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let result = match cli.command {
        Commands::Run(args) => {
            let settings = RunSettings::load(args.config.as_deref())?.merge_args(&args);
            let credentials = Credentials::from_env()?;
            runner::run(settings, credentials).await.map(|_| ())
        }
        Commands::Show { report } => runner::show(&report).map(|summary| println!("{summary}")),
    };

    rubric_telemetry::shutdown_telemetry();
    result
}
