//! Transport-level retries for provider adapters.
//!
//! Retries live here, below the [`ChatModel`](rubric_core::ChatModel) seam.
//! The grading protocol and the evaluation loop never retry on their own.

use rubric_core::{Result, RubricError};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    #[serde(with = "millis")]
    pub initial_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[must_use]
pub fn is_retryable_status_code(status_code: u16) -> bool {
    matches!(status_code, 408 | 409 | 429 | 500 | 502 | 503 | 504)
}

/// Adapters tag errors with `retryable` when the status code allows it;
/// anything else is matched on well-known transient phrases.
#[must_use]
pub fn is_retryable_error_message(message: &str) -> bool {
    let normalized = message.to_ascii_lowercase();
    if normalized.contains("non-retryable") {
        return false;
    }
    normalized.contains("retryable")
        || normalized.contains("rate limit")
        || normalized.contains("too many requests")
        || normalized.contains("overloaded")
        || normalized.contains("timed out")
        || normalized.contains("timeout")
        || normalized.contains("connection reset")
        || normalized.contains("connection closed")
}

#[must_use]
pub fn is_retryable_model_error(error: &RubricError) -> bool {
    match error {
        RubricError::Model(message) => is_retryable_error_message(message),
        _ => false,
    }
}

fn next_retry_delay(current: Duration, retry_config: &RetryConfig) -> Duration {
    let multiplier = retry_config.backoff_multiplier.max(1.0) as f64;
    Duration::from_secs_f64(current.as_secs_f64() * multiplier).min(retry_config.max_delay)
}

pub async fn execute_with_retry<T, Op, Fut, Classify>(
    retry_config: &RetryConfig,
    classify_error: Classify,
    mut operation: Op,
) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    Classify: Fn(&RubricError) -> bool,
{
    if !retry_config.enabled {
        return operation().await;
    }

    let mut attempt: u32 = 0;
    let mut delay = retry_config.initial_delay.min(retry_config.max_delay);

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < retry_config.max_retries && classify_error(&error) => {
                attempt += 1;
                rubric_telemetry::warn!(
                    attempt = attempt,
                    max_retries = retry_config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "provider request failed with retryable error; retrying"
                );
                tokio::time::sleep(delay).await;
                delay = next_retry_delay(delay, retry_config);
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn fast_retries(max_retries: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::ZERO)
            .with_max_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn retries_until_success_when_error_is_retryable() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = execute_with_retry(&fast_retries(2), is_retryable_model_error, || {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(RubricError::Model("API error (429, retryable)".to_string()));
                }
                Ok("ok")
            }
        })
        .await
        .expect("operation should succeed after retries");

        assert_eq!(result, "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retryable_error() {
        let attempts = Arc::new(AtomicU32::new(0));

        let error = execute_with_retry(&fast_retries(3), is_retryable_model_error, || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RubricError::Model("API error (400, non-retryable)".to_string()))
            }
        })
        .await
        .expect_err("operation should fail without retries");

        assert!(matches!(error, RubricError::Model(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_config_runs_once() {
        let attempts = Arc::new(AtomicU32::new(0));

        let error = execute_with_retry(
            &RetryConfig::disabled().with_max_retries(10),
            is_retryable_model_error,
            || {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(RubricError::Model("too many requests".to_string()))
                }
            },
        )
        .await
        .expect_err("disabled retries should return first error");

        assert!(matches!(error, RubricError::Model(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn classifies_status_codes_and_messages() {
        assert!(is_retryable_status_code(429));
        assert!(is_retryable_status_code(503));
        assert!(!is_retryable_status_code(401));
        assert!(is_retryable_error_message("request timed out"));
        assert!(!is_retryable_error_message("API error (401, non-retryable): bad key"));
        assert!(!is_retryable_model_error(&RubricError::Config("timeout".into())));
    }

    #[test]
    fn backoff_is_capped() {
        let config = RetryConfig::default()
            .with_initial_delay(Duration::from_secs(8))
            .with_max_delay(Duration::from_secs(10));
        assert_eq!(next_retry_delay(Duration::from_secs(8), &config), Duration::from_secs(10));
    }

    #[test]
    fn retry_config_reads_millis_from_toml_like_json() {
        let config: RetryConfig =
            serde_json::from_value(serde_json::json!({ "max_retries": 1, "initial_delay": 10 }))
                .unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.initial_delay, Duration::from_millis(10));
        assert!(config.enabled);
    }
}
