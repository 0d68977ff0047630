//! Run state and its reducer
//!
//! The evaluation loop is the only writer. Every transition goes through
//! [`RunState::apply`] and the resulting snapshot is handed to a
//! [`StateSink`] as an `Arc`, so observers never see a half-applied update
//! and cannot write back.

use crate::report::ExampleResult;
use crate::scoring::{ThemeScore, calculate_overall_score, update_theme_scores};
use chrono::{DateTime, Utc};
use rubric_core::{Message, TokenUsage};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Lifecycle of a run. Ordered so transitions can only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    #[default]
    Loading,
    Running,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleStage {
    Generating,
    Grading,
}

/// The example currently in flight
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentExample {
    pub index: usize,
    pub prompt_id: String,
    pub conversation: Vec<Message>,
    pub last_user_message: Option<String>,
    pub stage: ExampleStage,
    pub rubrics_total: usize,
    pub rubrics_graded: usize,
    pub model_response: Option<String>,
}

/// Snapshot of a run
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub phase: RunPhase,
    pub model: String,
    pub grader_model: String,
    pub dataset: String,
    pub total_examples: usize,
    /// Completed examples in dataset order, placeholders included
    pub results: Vec<ExampleResult>,
    pub theme_scores: BTreeMap<String, ThemeScore>,
    pub overall_score: f64,
    pub std_dev: f64,
    pub response_tokens: TokenUsage,
    pub grading_tokens: TokenUsage,
    pub response_time: Duration,
    pub grading_time: Duration,
    pub error_count: usize,
    pub last_error: Option<String>,
    pub current: Option<CurrentExample>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A state transition produced by the evaluation loop
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started {
        total_examples: usize,
    },
    ExampleStarted {
        index: usize,
        prompt_id: String,
        conversation: Vec<Message>,
        last_user_message: Option<String>,
        rubrics_total: usize,
    },
    ResponseGenerated {
        response: String,
        usage: TokenUsage,
        duration: Duration,
    },
    /// The model call failed after `duration`
    ResponseFailed {
        duration: Duration,
    },
    /// One grader call returned. Totals wait for the chunk.
    RubricGraded {
        graded: usize,
    },
    /// One grading chunk finished; `graded` counts items graded so far.
    GradingProgress {
        graded: usize,
        usage: TokenUsage,
        duration: Duration,
    },
    ExampleCompleted {
        result: ExampleResult,
        theme: Option<String>,
    },
    ExampleFailed {
        prompt_id: String,
        error: String,
    },
    Finished,
}

impl RunState {
    pub fn new(
        model: impl Into<String>,
        grader_model: impl Into<String>,
        dataset: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            grader_model: grader_model.into(),
            dataset: dataset.into(),
            ..Default::default()
        }
    }

    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn total_tokens(&self) -> TokenUsage {
        self.response_tokens + self.grading_tokens
    }

    /// Apply one event and return the next state.
    pub fn apply(mut self, event: RunEvent) -> Self {
        match event {
            RunEvent::Started { total_examples } => {
                self.advance(RunPhase::Running);
                self.total_examples = total_examples;
                self.started_at.get_or_insert_with(Utc::now);
            }
            RunEvent::ExampleStarted { index, prompt_id, conversation, last_user_message, rubrics_total } => {
                self.current = Some(CurrentExample {
                    index,
                    prompt_id,
                    conversation,
                    last_user_message,
                    stage: ExampleStage::Generating,
                    rubrics_total,
                    rubrics_graded: 0,
                    model_response: None,
                });
            }
            RunEvent::ResponseGenerated { response, usage, duration } => {
                self.response_tokens += usage;
                self.response_time += duration;
                if let Some(current) = self.current.as_mut() {
                    current.stage = ExampleStage::Grading;
                    current.model_response = Some(response);
                }
            }
            RunEvent::ResponseFailed { duration } => {
                self.response_time += duration;
            }
            RunEvent::RubricGraded { graded } => {
                if let Some(current) = self.current.as_mut() {
                    current.rubrics_graded = current.rubrics_graded.max(graded);
                }
            }
            RunEvent::GradingProgress { graded, usage, duration } => {
                self.grading_tokens += usage;
                self.grading_time += duration;
                if let Some(current) = self.current.as_mut() {
                    current.rubrics_graded = graded;
                }
            }
            RunEvent::ExampleCompleted { result, theme } => {
                update_theme_scores(&mut self.theme_scores, theme.as_deref(), result.score);
                self.push_result(result);
            }
            RunEvent::ExampleFailed { prompt_id, error } => {
                self.error_count += 1;
                self.last_error = Some(error);
                self.push_result(ExampleResult::placeholder(prompt_id));
            }
            RunEvent::Finished => {
                self.advance(RunPhase::Complete);
                self.current = None;
                self.finished_at = Some(Utc::now());
            }
        }
        self
    }

    fn advance(&mut self, phase: RunPhase) {
        self.phase = self.phase.max(phase);
    }

    fn push_result(&mut self, result: ExampleResult) {
        self.results.push(result);
        self.current = None;
        let overall = calculate_overall_score(&self.results);
        self.overall_score = overall.overall_score;
        self.std_dev = overall.std_dev;
    }
}

/// Receiver of run snapshots
pub type StateSink = Arc<dyn Fn(Arc<RunState>) + Send + Sync>;

/// Sink that forwards snapshots into an unbounded channel.
///
/// Snapshots sent after the receiver is dropped are discarded.
pub fn channel_sink(tx: mpsc::UnboundedSender<Arc<RunState>>) -> StateSink {
    Arc::new(move |state| {
        let _ = tx.send(state);
    })
}
