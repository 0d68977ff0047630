//! Span helpers for benchmark operations
//!
//! Pre-configured spans for a run, each example, model calls and rubric grading.

use tracing::Span;

/// Create a span covering a whole evaluation run
///
/// # Example
/// ```
/// use rubric_telemetry::evaluation_run_span;
/// let span = evaluation_run_span("gpt-4.1", "hard_subset");
/// let _enter = span.enter();
/// ```
pub fn evaluation_run_span(model_name: &str, dataset: &str) -> Span {
    tracing::info_span!(
        "evaluation.run",
        model.name = model_name,
        dataset = dataset,
        otel.kind = "internal"
    )
}

/// Create a span for one dataset example
pub fn example_span(index: usize, prompt_id: &str) -> Span {
    tracing::info_span!(
        "evaluation.example",
        example.index = index,
        example.prompt_id = prompt_id,
        otel.kind = "internal"
    )
}

/// Create a span for model API calls
///
/// # Example
/// ```
/// use rubric_telemetry::model_call_span;
/// let span = model_call_span("gpt-4.1");
/// let _enter = span.enter();
/// ```
pub fn model_call_span(model_name: &str) -> Span {
    tracing::info_span!("model.call", model.name = model_name, otel.kind = "client")
}

/// Create a span for grading every rubric item of one example
pub fn grading_span(grader_name: &str, rubric_count: usize) -> Span {
    tracing::debug_span!(
        "rubric.grade",
        grader.name = grader_name,
        rubric.count = rubric_count,
    )
}
