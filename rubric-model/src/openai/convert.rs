//! Wire types and conversions for the chat-completions API.

use rubric_core::{ChatRequest, ChatResponse, Message, Result, RubricError, TokenUsage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Error envelope returned by OpenAI-compatible servers on 4xx/5xx.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

pub fn message_to_wire(message: &Message) -> WireMessage {
    WireMessage { role: message.role.to_string(), content: Some(message.content.clone()) }
}

/// Build the request body. `default_max_tokens` applies only when the
/// request config leaves the cap unset.
pub fn build_request(
    model: &str,
    request: &ChatRequest,
    default_max_tokens: Option<u32>,
) -> ChatCompletionRequest {
    let config = request.config.clone().unwrap_or_default();
    ChatCompletionRequest {
        model: model.to_string(),
        messages: request.messages.iter().map(message_to_wire).collect(),
        temperature: config.temperature,
        max_completion_tokens: config.max_output_tokens.or(default_max_tokens),
        reasoning_effort: config.reasoning_effort.map(|e| e.to_string()),
    }
}

impl From<&Usage> for TokenUsage {
    fn from(usage: &Usage) -> Self {
        let total = if usage.total_tokens == 0 {
            usage.prompt_tokens + usage.completion_tokens
        } else {
            usage.total_tokens
        };
        TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: total,
        }
    }
}

pub fn from_completion(provider_name: &str, response: ChatCompletionResponse) -> Result<ChatResponse> {
    let usage = response.usage.as_ref().map(TokenUsage::from).unwrap_or_default();
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RubricError::Model(format!("{provider_name} returned no choices")))?;

    let text = choice.message.and_then(|m| m.content).unwrap_or_default();
    if text.trim().is_empty() {
        let reason = choice.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(RubricError::Model(format!(
            "{provider_name} returned empty content (finish_reason: {reason})"
        )));
    }

    Ok(ChatResponse { text, usage })
}

/// Pull a readable message out of an error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubric_core::ReasoningEffort;
    use serde_json::json;

    #[test]
    fn test_build_request_maps_config() {
        let request = ChatRequest::new("ignored", vec![Message::system("sys"), Message::user("hi")])
            .with_temperature(0.0)
            .with_reasoning_effort(ReasoningEffort::Low);
        let body = serde_json::to_value(build_request("gpt-4.1", &request, Some(256))).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "gpt-4.1",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.0,
                "max_completion_tokens": 256,
                "reasoning_effort": "low"
            })
        );
    }

    #[test]
    fn test_from_completion_reads_text_and_usage() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }))
        .unwrap();

        let resp = from_completion("openai", response).unwrap();
        assert_eq!(resp.text, "hello");
        assert_eq!(resp.usage, TokenUsage::new(12, 3));
    }

    #[test]
    fn test_from_completion_rejects_empty_content() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "length"}]
        }))
        .unwrap();

        let err = from_completion("openai", response).unwrap_err();
        assert!(err.to_string().contains("empty content"));
        assert!(err.to_string().contains("length"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":{"message":"bad key","type":"auth"}}"#), "bad key");
        assert_eq!(error_message("gateway timeout\n"), "gateway timeout");
    }
}
