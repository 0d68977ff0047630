use crate::cli::RunArgs;
use anyhow::{Context, Result};
use rubric_core::ReasoningEffort;
use rubric_model::{OpenAICompatibleConfig, RetryConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rubric-bench.toml";

/// Settings for one `run`, layered as defaults < TOML file < CLI flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub dataset: Option<PathBuf>,
    pub model: String,
    pub grader: String,
    pub limit: Option<usize>,
    pub seed: Option<u64>,
    pub concurrency: usize,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub max_output_tokens: Option<u32>,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            dataset: None,
            model: "gpt-4.1".to_string(),
            grader: "gpt-4.1".to_string(),
            limit: None,
            seed: None,
            concurrency: 5,
            reasoning_effort: None,
            max_output_tokens: None,
            output_dir: PathBuf::from("results"),
            request_timeout_secs: 120,
            retry: RetryConfig::default(),
        }
    }
}

impl RunSettings {
    /// Read settings from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Overlay flags that were given on the command line.
    pub fn merge_args(mut self, args: &RunArgs) -> Self {
        if let Some(dataset) = &args.dataset {
            self.dataset = Some(dataset.clone());
        }
        if let Some(model) = &args.model {
            self.model = model.clone();
        }
        if let Some(grader) = &args.grader {
            self.grader = grader.clone();
        }
        if let Some(output_dir) = &args.output_dir {
            self.output_dir = output_dir.clone();
        }
        self.limit = args.limit.or(self.limit);
        self.seed = args.seed.or(self.seed);
        self.concurrency = args.concurrency.unwrap_or(self.concurrency);
        self.reasoning_effort = args.reasoning_effort.or(self.reasoning_effort);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Endpoint credentials for one model
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub api_key: String,
    pub base_url: Option<String>,
}

impl Endpoint {
    pub fn client_config(&self, model: &str, timeout: Duration) -> OpenAICompatibleConfig {
        let config = OpenAICompatibleConfig::new(&self.api_key, model).with_timeout(timeout);
        match &self.base_url {
            Some(base_url) => config.with_base_url(base_url),
            None => config,
        }
    }
}

/// Credentials for the model under test and the grader
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub model: Endpoint,
    pub grader: Endpoint,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `OPENAI_*` variables serve both models unless `GRADER_*` overrides them.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model = Endpoint {
            api_key: non_empty("OPENAI_API_KEY")
                .context("OPENAI_API_KEY environment variable not set")?,
            base_url: non_empty("OPENAI_BASE_URL"),
        };
        let grader = Endpoint {
            api_key: non_empty("GRADER_API_KEY").unwrap_or_else(|| model.api_key.clone()),
            base_url: non_empty("GRADER_BASE_URL").or_else(|| model.base_url.clone()),
        };
        Ok(Self { model, grader })
    }
}
