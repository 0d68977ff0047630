//! Core evaluator implementation
//!
//! The Evaluator walks a dataset one example at a time: generate a
//! response, grade it rubric by rubric, score it, and fold the result into
//! the run state. Examples never overlap; only the grading of a single
//! example fans out.

use crate::error::{EvalError, Result};
use crate::grader::Grader;
use crate::report::ExampleResult;
use crate::scheduler::{DEFAULT_CONCURRENCY, GradingScheduler, GradingUpdate};
use crate::schema::{Dataset, Example};
use crate::scoring::calculate_example_score;
use crate::state::{RunEvent, RunState, StateSink};

use rubric_core::{ChatModel, ChatRequest, GenerateConfig, Message, ReasoningEffort};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Configuration for the evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Maximum grader calls in flight for one example
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// System message prepended to every example conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            system_prompt: default_system_prompt(),
            reasoning_effort: None,
            max_output_tokens: None,
        }
    }
}

impl EvaluationConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }
}

/// The main evaluator struct
pub struct Evaluator {
    config: EvaluationConfig,
    model: Arc<dyn ChatModel>,
    grader: Grader,
    scheduler: GradingScheduler,
    sink: Option<StateSink>,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig, model: Arc<dyn ChatModel>, grader: Grader) -> Self {
        let scheduler = GradingScheduler::new(config.concurrency);
        Self { config, model, grader, scheduler, sink: None }
    }

    /// Publish every state snapshot to `sink`.
    pub fn with_sink(mut self, sink: StateSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate every example of `dataset` in order.
    ///
    /// A failure on the first example aborts the run with
    /// [`EvalError::Aborted`]. Later failures are recorded as zero-scored
    /// placeholders and the run continues.
    pub async fn run(&self, dataset: &Dataset) -> Result<RunState> {
        let span = rubric_telemetry::evaluation_run_span(self.model.name(), &dataset.id);
        self.run_inner(dataset).instrument(span).await
    }

    async fn run_inner(&self, dataset: &Dataset) -> Result<RunState> {
        let mut state = Arc::new(RunState::new(self.model.name(), self.grader.model_name(), &dataset.id));
        self.publish(&state);
        self.transition(&mut state, RunEvent::Started { total_examples: dataset.len() });
        tracing::info!(examples = dataset.len(), concurrency = self.scheduler.concurrency(), "evaluation started");

        for (index, example) in dataset.examples.iter().enumerate() {
            let span = rubric_telemetry::example_span(index, &example.prompt_id);
            let outcome = self.evaluate_example(&mut state, index, example).instrument(span).await;

            match outcome {
                Ok(result) => {
                    tracing::info!(
                        index,
                        prompt_id = %example.prompt_id,
                        score = result.score,
                        "example completed"
                    );
                    let theme = example.theme().map(str::to_string);
                    self.transition(&mut state, RunEvent::ExampleCompleted { result, theme });
                }
                Err(e) if index == 0 => {
                    tracing::error!(prompt_id = %example.prompt_id, error = %e, "first example failed, aborting run");
                    return Err(EvalError::Aborted { prompt_id: example.prompt_id.clone(), source: Box::new(e) });
                }
                Err(e) => {
                    tracing::warn!(index, prompt_id = %example.prompt_id, error = %e, "example failed");
                    self.transition(
                        &mut state,
                        RunEvent::ExampleFailed { prompt_id: example.prompt_id.clone(), error: e.to_string() },
                    );
                }
            }
        }

        self.transition(&mut state, RunEvent::Finished);
        tracing::info!(
            overall_score = state.overall_score,
            std_dev = state.std_dev,
            errors = state.error_count,
            "evaluation complete"
        );
        Ok(Arc::unwrap_or_clone(state))
    }

    async fn evaluate_example(
        &self,
        state: &mut Arc<RunState>,
        index: usize,
        example: &Example,
    ) -> Result<ExampleResult> {
        self.transition(
            state,
            RunEvent::ExampleStarted {
                index,
                prompt_id: example.prompt_id.clone(),
                conversation: example.conversation.clone(),
                last_user_message: example.last_user_message().map(str::to_string),
                rubrics_total: example.rubrics.len(),
            },
        );

        let started = Instant::now();
        let reply = match self.model.generate(self.response_request(example)).await {
            Ok(reply) => reply,
            Err(e) => {
                self.transition(state, RunEvent::ResponseFailed { duration: started.elapsed() });
                return Err(e.into());
            }
        };
        self.transition(
            state,
            RunEvent::ResponseGenerated {
                response: reply.text.clone(),
                usage: reply.usage,
                duration: started.elapsed(),
            },
        );

        let span = rubric_telemetry::grading_span(self.grader.model_name(), example.rubrics.len());
        let grading = self
            .scheduler
            .grade_all(&self.grader, &example.conversation, &reply.text, &example.rubrics, |update| {
                let event = match update {
                    GradingUpdate::ItemGraded { graded, .. } => RunEvent::RubricGraded { graded },
                    GradingUpdate::ChunkFinished(chunk) => RunEvent::GradingProgress {
                        graded: chunk.graded,
                        usage: chunk.usage,
                        duration: chunk.duration,
                    },
                };
                self.transition(state, event);
            })
            .instrument(span)
            .await;

        let score = calculate_example_score(&grading.results);
        Ok(ExampleResult {
            prompt_id: example.prompt_id.clone(),
            model_response: reply.text,
            rubric_results: grading.results,
            achieved_points: score.achieved_points,
            total_points: score.total_points,
            score: score.score,
        })
    }

    fn response_request(&self, example: &Example) -> ChatRequest {
        let mut messages = Vec::with_capacity(example.conversation.len() + 1);
        messages.push(Message::system(self.config.system_prompt.clone()));
        messages.extend(example.conversation.iter().cloned());

        ChatRequest::new(self.model.name(), messages).with_config(GenerateConfig {
            temperature: None,
            max_output_tokens: self.config.max_output_tokens,
            reasoning_effort: self.config.reasoning_effort,
        })
    }

    fn transition(&self, state: &mut Arc<RunState>, event: RunEvent) {
        let current = std::mem::take(state);
        *state = Arc::new(Arc::unwrap_or_clone(current).apply(event));
        self.publish(state);
    }

    fn publish(&self, state: &Arc<RunState>) {
        if let Some(sink) = &self.sink {
            sink(Arc::clone(state));
        }
    }
}
