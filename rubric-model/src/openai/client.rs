//! OpenAI-compatible client implementation.

use super::config::OpenAICompatibleConfig;
use super::convert::{self, ChatCompletionResponse};
use crate::retry::{
    RetryConfig, execute_with_retry, is_retryable_model_error, is_retryable_status_code,
};
use async_trait::async_trait;
use reqwest::Client;
use rubric_core::{ChatModel, ChatRequest, ChatResponse, Result, RubricError};
use tracing::Instrument;

/// Non-streaming chat-completions client.
///
/// # Example
///
/// ```rust,ignore
/// use rubric_model::openai::{OpenAICompatibleClient, OpenAICompatibleConfig};
///
/// let client = OpenAICompatibleClient::new(OpenAICompatibleConfig::new(
///     std::env::var("OPENAI_API_KEY").unwrap(),
///     "gpt-4.1",
/// ))?;
/// ```
pub struct OpenAICompatibleClient {
    client: Client,
    config: OpenAICompatibleConfig,
    retry_config: RetryConfig,
}

impl OpenAICompatibleClient {
    /// Create a new client.
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RubricError::Config(format!(
                "{} API key is empty",
                config.provider_name
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RubricError::Model(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config, retry_config: RetryConfig::default() })
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.config.effective_base_url().trim_end_matches('/'))
    }

    async fn send_once(&self, body: &convert::ChatCompletionRequest) -> Result<ChatResponse> {
        let provider = &self.config.provider_name;
        let mut request = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.config.api_key)
            .json(body);
        if let Some(org) = &self.config.organization_id {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "failed" };
            RubricError::Model(format!("{provider} request {kind}: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let retryability = if is_retryable_status_code(status.as_u16()) {
                "retryable"
            } else {
                "non-retryable"
            };
            return Err(RubricError::Model(format!(
                "{provider} API error ({status}, {retryability}): {}",
                convert::error_message(&error_text)
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RubricError::Model(format!("{provider} returned malformed JSON: {e}")))?;

        convert::from_completion(provider, completion)
    }
}

#[async_trait]
impl ChatModel for OpenAICompatibleClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = convert::build_request(&self.config.model, &request, self.config.max_output_tokens);
        let span = rubric_telemetry::model_call_span(&self.config.model);

        async {
            let response =
                execute_with_retry(&self.retry_config, is_retryable_model_error, || self.send_once(&body))
                    .await?;
            tracing::debug!(
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                "model call completed"
            );
            Ok::<_, RubricError>(response)
        }
        .instrument(span)
        .await
    }
}
