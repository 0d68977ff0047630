//! The `run` pipeline end to end with mock models, and `show` on its output.

use std::sync::Arc;

use rubric_cli::RunSettings;
use rubric_cli::runner::{run_with_models, show};
use rubric_core::{ChatResponse, Message, TokenUsage};
use rubric_eval::{Dataset, EvaluationReport, Example, RubricItem};
use rubric_model::MockModel;

fn dataset() -> Dataset {
    let examples = (0..3)
        .map(|i| {
            Example::new(format!("p{i}"), vec![Message::user(format!("question {i}"))])
                .with_rubric(RubricItem::new("Answers the question", 2.0))
                .with_rubric(RubricItem::new("Invents a diagnosis", -3.0))
                .with_tag("theme:hedging")
        })
        .collect();
    Dataset::new("mini", examples)
}

fn models() -> (Arc<MockModel>, Arc<MockModel>) {
    let candidate = MockModel::from_fn("gpt-4.1-mini", |_| {
        Ok(ChatResponse::new("a careful answer", TokenUsage::new(100, 50)))
    });
    let grader = MockModel::from_fn("gpt-4.1", |request| {
        let met = request.last_user_text().is_some_and(|t| t.contains("[2] Answers"));
        let reply = serde_json::json!({ "explanation": "ok", "criteria_met": met });
        Ok(ChatResponse::new(reply.to_string(), TokenUsage::new(400, 20)))
    });
    (Arc::new(candidate), Arc::new(grader))
}

#[tokio::test]
async fn test_run_saves_report_and_show_reads_it() {
    let dir = tempfile::tempdir().unwrap();
    let settings = RunSettings { output_dir: dir.path().to_path_buf(), ..RunSettings::default() };
    let (candidate, grader) = models();

    let path = run_with_models(&settings, &dataset(), candidate, grader).await.unwrap();

    let report = EvaluationReport::load(&path).unwrap();
    assert_eq!(report.model, "gpt-4.1-mini");
    assert_eq!(report.dataset, "mini");
    assert_eq!(report.num_examples, 3);
    assert_eq!(report.overall_score, 1.0);
    assert_eq!(report.theme_scores["hedging"].examples, 3);
    assert_eq!(report.tokens.response.total_tokens, 450);
    assert_eq!(report.tokens.grading.total_tokens, 6 * 420);
    assert!(report.cost.total_usd.is_some());

    let summary = show(&path).unwrap();
    assert!(summary.contains("Overall Score: 1.000"));
}

#[tokio::test]
async fn test_first_example_failure_is_an_error_and_saves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = RunSettings { output_dir: dir.path().join("out"), ..RunSettings::default() };
    let candidate = Arc::new(MockModel::new("gpt-4.1-mini").with_error("invalid api key"));
    let (_, grader) = models();

    let err = run_with_models(&settings, &dataset(), candidate, grader).await.unwrap_err();

    assert!(format!("{err:#}").contains("invalid api key"));
    assert!(!dir.path().join("out").exists());
}
