//! Grading scheduler behavior against a latency-controlled mock grader.

use std::sync::Arc;
use std::time::Duration;

use rubric_core::{ChatRequest, ChatResponse, Message, RubricError, TokenUsage};
use rubric_eval::{Grader, GraderConfig, GradingScheduler, GradingUpdate, RubricItem};
use rubric_model::MockModel;

/// The `[points] criterion` line of a grader prompt.
fn rubric_line(request: &ChatRequest) -> String {
    request
        .last_user_text()
        .and_then(|text| text.split("# Rubric item\n").nth(1))
        .and_then(|rest| rest.lines().next())
        .unwrap_or_default()
        .to_string()
}

fn item_number(request: &ChatRequest) -> u64 {
    rubric_line(request).rsplit('-').next().and_then(|n| n.parse().ok()).unwrap_or(0)
}

fn echo_grader() -> MockModel {
    MockModel::from_fn("grader", |request| {
        let met = item_number(request) % 2 == 0;
        let reply = serde_json::json!({ "explanation": rubric_line(request), "criteria_met": met });
        Ok(ChatResponse::new(format!("```json\n{reply}\n```"), TokenUsage::new(10, 2)))
    })
}

fn items(n: usize) -> Vec<RubricItem> {
    (0..n).map(|i| RubricItem::new(format!("item-{i}"), 1.0)).collect()
}

#[tokio::test]
async fn test_results_keep_rubric_order_when_later_calls_finish_first() {
    let model = Arc::new(
        echo_grader().with_latency(|request| Duration::from_millis(60 - 10 * item_number(request))),
    );
    let grader = Grader::new(model.clone());
    let mut updates = Vec::new();

    let outcome = GradingScheduler::new(2)
        .grade_all(&grader, &[Message::user("q")], "a", &items(5), |update| updates.push(update))
        .await;

    let explanations: Vec<_> = outcome.results.iter().map(|r| r.explanation.clone()).collect();
    assert_eq!(explanations, (0..5).map(|i| format!("[1] item-{i}")).collect::<Vec<_>>());
    let met: Vec<_> = outcome.results.iter().map(|r| r.criteria_met).collect();
    assert_eq!(met, vec![true, false, true, false, true]);

    assert_eq!(model.max_in_flight(), 2);
    let chunks: Vec<_> = updates
        .iter()
        .filter_map(|u| match u {
            GradingUpdate::ChunkFinished(chunk) => Some(*chunk),
            GradingUpdate::ItemGraded { .. } => None,
        })
        .collect();
    assert_eq!(chunks.iter().map(|c| c.graded).collect::<Vec<_>>(), vec![2, 4, 5]);
    assert_eq!(outcome.usage.total_tokens, 60);
    assert_eq!(chunks.iter().map(|c| c.usage.total_tokens).sum::<u64>(), 60);
}

#[tokio::test]
async fn test_every_item_reports_progress_before_its_chunk_totals() {
    let model = Arc::new(
        echo_grader().with_latency(|request| Duration::from_millis(60 - 10 * item_number(request))),
    );
    let grader = Grader::new(model);
    let mut updates = Vec::new();

    GradingScheduler::new(2)
        .grade_all(&grader, &[Message::user("q")], "a", &items(5), |update| updates.push(update))
        .await;

    let graded: Vec<_> = updates
        .iter()
        .map(|u| match u {
            GradingUpdate::ItemGraded { graded, total } => {
                assert_eq!(*total, 5);
                format!("item {graded}")
            }
            GradingUpdate::ChunkFinished(chunk) => format!("chunk {}", chunk.graded),
        })
        .collect();
    assert_eq!(
        graded,
        vec!["item 1", "item 2", "chunk 2", "item 3", "item 4", "chunk 4", "item 5", "chunk 5"]
    );
}

#[tokio::test]
async fn test_concurrency_bound_holds_for_large_rubrics() {
    let model = Arc::new(echo_grader().with_latency(|_| Duration::from_millis(5)));
    let grader = Grader::new(model.clone());

    let outcome =
        GradingScheduler::new(3).grade_all(&grader, &[Message::user("q")], "a", &items(10), |_| {}).await;

    assert_eq!(outcome.results.len(), 10);
    assert_eq!(model.call_count(), 10);
    assert!(model.max_in_flight() <= 3);
}

#[tokio::test]
async fn test_failed_item_does_not_affect_siblings() {
    let model = Arc::new(MockModel::from_fn("grader", |request| {
        if item_number(request) == 1 {
            return Err(RubricError::Model("connection reset".to_string()));
        }
        Ok(ChatResponse::text(r#"{"explanation": "fine", "criteria_met": true}"#))
    }));
    let grader = Grader::new(model.clone());

    let outcome =
        GradingScheduler::new(5).grade_all(&grader, &[Message::user("q")], "a", &items(3), |_| {}).await;

    assert!(outcome.results[0].criteria_met);
    assert!(!outcome.results[1].criteria_met);
    assert!(outcome.results[1].explanation.contains("connection reset"));
    assert!(outcome.results[2].criteria_met);
}

#[tokio::test]
async fn test_unparseable_reply_is_not_met() {
    let model = Arc::new(MockModel::new("grader").with_text("Yes, the criterion is clearly met."));
    let grader = Grader::new(model.clone());

    let outcome =
        grader.grade_rubric_item(&[Message::user("q")], "a", &RubricItem::new("Answers", 3.0)).await;

    assert!(!outcome.result.criteria_met);
    assert!(outcome.result.explanation.contains("no JSON object"));
    assert_eq!(outcome.result.points, 3.0);
}

#[tokio::test]
async fn test_grader_request_is_deterministic_two_turn_chat() {
    let model = Arc::new(echo_grader());
    let grader = Grader::new(model.clone());

    grader.grade_rubric_item(&[Message::user("q")], "a", &RubricItem::new("item-0", 1.0)).await;

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature(), Some(0.0));
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[0].messages[0], Message::system("You are a helpful assistant."));
    assert_eq!(requests[0].model, "grader");
}

#[tokio::test]
async fn test_custom_grader_config_reaches_request() {
    let model = Arc::new(echo_grader());
    let config = GraderConfig { temperature: 0.3, system_prompt: "Grade strictly.".to_string() };
    let grader = Grader::with_config(model.clone(), config);

    let outcome = grader.grade_rubric_item(&[Message::user("q")], "a", &RubricItem::new("item-2", 1.0)).await;

    assert!(outcome.result.criteria_met);
    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages[0], Message::system("Grade strictly."));
    assert_eq!(requests[0].temperature(), Some(0.3));
}
