//! Dataset schema definitions
//!
//! Examples are stored one JSON object per line (`.jsonl`). Field names
//! follow the public rubric-benchmark format (`prompt`, `rubrics`,
//! `example_tags`); the Rust names are accepted as well.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rubric_core::{Message, Role};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EvalError, Result};

/// Tag prefix that assigns an example to a theme.
pub const THEME_TAG_PREFIX: &str = "theme:";

/// One weighted, independently gradable criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricItem {
    pub criterion: String,
    /// Negative points mark undesirable behavior.
    pub points: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RubricItem {
    pub fn new(criterion: impl Into<String>, points: f64) -> Self {
        Self { criterion: criterion.into(), points, tags: Vec::new() }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A single labeled dataset example
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub prompt_id: String,
    #[serde(alias = "prompt")]
    pub conversation: Vec<Message>,
    pub rubrics: Vec<RubricItem>,
    #[serde(default, alias = "example_tags")]
    pub tags: Vec<String>,
}

impl Example {
    pub fn new(prompt_id: impl Into<String>, conversation: Vec<Message>) -> Self {
        Self { prompt_id: prompt_id.into(), conversation, rubrics: Vec::new(), tags: Vec::new() }
    }

    pub fn with_rubric(mut self, rubric: RubricItem) -> Self {
        self.rubrics.push(rubric);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Name of the first `theme:` tag, if any.
    pub fn theme(&self) -> Option<&str> {
        theme_of(&self.tags)
    }

    /// Content of the most recent user turn, for display.
    pub fn last_user_message(&self) -> Option<&str> {
        self.conversation
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Name of the first `theme:<name>` tag in `tags`.
pub fn theme_of(tags: &[String]) -> Option<&str> {
    tags.iter()
        .find_map(|tag| tag.strip_prefix(THEME_TAG_PREFIX))
        .filter(|name| !name.is_empty())
}

/// An ordered collection of examples
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Identifier used in reports (the file stem for on-disk datasets)
    pub id: String,
    pub examples: Vec<Example>,
}

impl Dataset {
    pub fn new(id: impl Into<String>, examples: Vec<Example>) -> Self {
        Self { id: id.into(), examples }
    }

    /// Load a JSONL dataset from disk. Blank lines are skipped.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EvalError::LoadError { path: display.clone(), message: e.to_string() })?;

        let mut examples = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let example: Example = serde_json::from_str(line).map_err(|e| EvalError::ParseError {
                path: display.clone(),
                line: index + 1,
                message: e.to_string(),
            })?;
            examples.push(example);
        }

        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
            .to_string();
        tracing::info!(dataset = %id, examples = examples.len(), "loaded dataset");
        Ok(Self { id, examples })
    }

    /// Keep at most `limit` examples, drawn uniformly without replacement.
    ///
    /// The kept examples stay in dataset order. A `None` seed draws a
    /// fresh one.
    pub fn sample(mut self, limit: Option<usize>, seed: Option<u64>) -> Self {
        let Some(limit) = limit else {
            return self;
        };
        if limit >= self.examples.len() {
            return self;
        }

        let seed = seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = rand::seq::index::sample(&mut rng, self.examples.len(), limit).into_vec();
        picked.sort_unstable();
        tracing::debug!(seed, limit, "sampled dataset");

        let mut examples: Vec<Option<Example>> = self.examples.drain(..).map(Some).collect();
        self.examples = picked.into_iter().filter_map(|i| examples[i].take()).collect();
        self
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
