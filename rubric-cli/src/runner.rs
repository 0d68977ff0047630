//! `run` and `show` commands

use crate::config::{Credentials, RunSettings};
use anyhow::{Context, Result};
use rubric_core::ChatModel;
use rubric_eval::{
    Dataset, EvaluationConfig, EvaluationReport, Evaluator, Grader, PricingTable, RunState,
    channel_sink,
};
use rubric_model::OpenAICompatibleClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Run one evaluation and save its report. Returns the report path.
pub async fn run(settings: RunSettings, credentials: Credentials) -> Result<PathBuf> {
    let dataset_path = settings.dataset.as_deref().context("no dataset given (use --dataset)")?;
    let dataset = Dataset::load_jsonl(dataset_path)?.sample(settings.limit, settings.seed);

    let model = build_client(&settings, &credentials, &settings.model, false)?;
    let grader = build_client(&settings, &credentials, &settings.grader, true)?;
    run_with_models(&settings, &dataset, model, grader).await
}

/// Evaluate `dataset` with already constructed models.
pub async fn run_with_models(
    settings: &RunSettings,
    dataset: &Dataset,
    model: Arc<dyn ChatModel>,
    grader: Arc<dyn ChatModel>,
) -> Result<PathBuf> {
    let config = EvaluationConfig {
        concurrency: settings.concurrency,
        reasoning_effort: settings.reasoning_effort,
        max_output_tokens: settings.max_output_tokens,
        ..EvaluationConfig::default()
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(log_progress(rx));
    let evaluator = Evaluator::new(config, model, Grader::new(grader)).with_sink(channel_sink(tx));

    let outcome = evaluator.run(dataset).await;
    drop(evaluator);
    if let Err(e) = progress.await {
        tracing::warn!(error = %e, "progress logger stopped");
    }
    let state = outcome.context("evaluation aborted")?;

    let report = EvaluationReport::from_state(&state, &PricingTable::default());
    let path = report.save(&settings.output_dir)?;
    println!("{}", report.format_summary());
    println!("Report saved to {}", path.display());
    Ok(path)
}

/// Summary of a saved report.
pub fn show(path: &Path) -> Result<String> {
    let report = EvaluationReport::load(path)?;
    Ok(report.format_summary())
}

fn build_client(
    settings: &RunSettings,
    credentials: &Credentials,
    model: &str,
    grading: bool,
) -> Result<Arc<dyn ChatModel>> {
    let endpoint = if grading { &credentials.grader } else { &credentials.model };
    let client = OpenAICompatibleClient::new(endpoint.client_config(model, settings.request_timeout()))
        .with_context(|| format!("failed to create client for {model}"))?
        .with_retry_config(settings.retry.clone());
    Ok(Arc::new(client))
}

/// Log one line per finished example until the evaluator drops its sender.
async fn log_progress(mut rx: mpsc::UnboundedReceiver<Arc<RunState>>) {
    let mut seen = 0;
    while let Some(state) = rx.recv().await {
        for result in state.results.iter().skip(seen) {
            tracing::info!(
                "[{}/{}] {} score={:.3} running={:.3} errors={}",
                seen + 1,
                state.total_examples,
                result.prompt_id,
                result.score,
                state.overall_score,
                state.error_count
            );
            seen += 1;
        }
    }
}
