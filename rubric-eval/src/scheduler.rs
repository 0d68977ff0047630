//! Bounded-concurrency grading of one example's rubric items

use crate::grader::Grader;
use crate::report::RubricResult;
use crate::schema::RubricItem;
use futures::stream::{FuturesUnordered, StreamExt};
use rubric_core::{Message, TokenUsage};
use std::time::{Duration, Instant};

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Reported after each chunk of grader calls completes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkProgress {
    /// Items graded so far, this chunk included
    pub graded: usize,
    pub total: usize,
    /// Tokens spent by this chunk alone
    pub usage: TokenUsage,
    pub duration: Duration,
}

/// Progress reported while an example is being graded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradingUpdate {
    /// One grader call returned; `graded` counts every finished item so far
    ItemGraded { graded: usize, total: usize },
    /// A whole chunk returned and its usage can be folded into totals
    ChunkFinished(ChunkProgress),
}

/// All verdicts for one example, in rubric order
#[derive(Debug, Clone, Default)]
pub struct GradingOutcome {
    pub results: Vec<RubricResult>,
    pub usage: TokenUsage,
    pub duration: Duration,
}

/// Grades rubric items in sequential chunks of `concurrency` parallel calls.
#[derive(Debug, Clone, Copy)]
pub struct GradingScheduler {
    concurrency: usize,
}

impl Default for GradingScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl GradingScheduler {
    /// A limit of 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency: concurrency.max(1) }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Grade every item, reporting each finished call and each finished chunk.
    ///
    /// A chunk starts only after the previous one has fully finished, so at
    /// most `concurrency` grader calls are outstanding at any time. Usage and
    /// duration are reported only with [`GradingUpdate::ChunkFinished`].
    pub async fn grade_all<F>(
        &self,
        grader: &Grader,
        conversation: &[Message],
        response: &str,
        items: &[RubricItem],
        mut on_update: F,
    ) -> GradingOutcome
    where
        F: FnMut(GradingUpdate),
    {
        let total = items.len();
        let mut done = 0;
        let mut outcome = GradingOutcome { results: Vec::with_capacity(total), ..Default::default() };

        for chunk in items.chunks(self.concurrency) {
            let started = Instant::now();
            let mut pending: FuturesUnordered<_> = chunk
                .iter()
                .enumerate()
                .map(|(slot, item)| async move {
                    (slot, grader.grade_rubric_item(conversation, response, item).await)
                })
                .collect();

            // Calls finish in any order; slots keep rubric order.
            let mut slots = vec![None; chunk.len()];
            let mut usage = TokenUsage::default();
            while let Some((slot, graded)) = pending.next().await {
                usage += graded.usage;
                slots[slot] = Some(graded.result);
                done += 1;
                on_update(GradingUpdate::ItemGraded { graded: done, total });
            }
            let duration = started.elapsed();

            outcome.results.extend(slots.into_iter().flatten());
            outcome.usage += usage;
            outcome.duration += duration;

            tracing::debug!(graded = outcome.results.len(), total, "grading chunk finished");
            on_update(GradingUpdate::ChunkFinished(ChunkProgress {
                graded: outcome.results.len(),
                total,
                usage,
                duration,
            }));
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_concurrency_is_one() {
        assert_eq!(GradingScheduler::new(0).concurrency(), 1);
        assert_eq!(GradingScheduler::default().concurrency(), 5);
    }
}
