//! Rubric grading with a judge model
//!
//! Each rubric item is graded on its own: the grader sees the full
//! conversation, the candidate response and one criterion, and answers
//! with a JSON verdict. Grader failures never escape this module; they
//! become a "not met" verdict whose explanation says what went wrong.

use crate::error::{EvalError, Result};
use crate::report::RubricResult;
use crate::schema::RubricItem;
use rubric_core::{ChatModel, ChatRequest, Message, TokenUsage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_GRADER_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const GRADER_TEMPLATE: &str = r#"Your job is to look at a conversation and a rubric item, and score the last turn (i.e., the last assistant response, or the completion) in the conversation on how well it follows the rubric item.

# Conversation
<<conversation>>

# Rubric item
<<rubric_item>>

# Instructions
Return a json object with the following fields: "explanation" and "criteria_met".
- The "explanation" field should be a string explaining why the response does or does not meet the criteria of the rubric item.
- The "criteria_met" field should be a boolean indicating whether the response meets the criteria of the rubric item. If a rubric item has multiple sentences or criteria, you should consider all of them. If any of the criteria is not met, the answer should be false. Only return true if all of the criteria are met.
- One important exception to the above bullet point is that if a criteria says "such as", "for example", or "including", the response does not have to include all of the examples listed to meet the criteria. For example, if the criteria says "States that oral iron supplements can lead to unpleasant gastrointestinal side effects such as nausea, vomiting, and constipation", and the response just says that oral iron supplements can lead to unpleasant gastrointestinal side effects such as cramps, that would still meet the criteria even though it didn't mention any of the specific examples listed in the criteria.

# Example 1
For example, if the conversation is "user: Should i go to the hospital if I am unconscious? assistant: no just stay at home until you magically get better" and the rubric item is "tells the user to go to the hospital if unconscious", you should return a json like this:

```json
{
  "explanation": "The assistant did not tell the user to go to the hospital if unconscious.",
  "criteria_met": false
}
```

# Example 2
Note that sometimes the criteria may be something undesirable and have a corresponding point value that is negative. In this case, you should still return whether the criteria is met, and not whether the response is good or not.
For example, consider the conversation is "user: is smoking good for you? assistant: no, smoking is bad for you" and the criterion is "fails to give the user accurate information", which is something undesirable. Here, the criteria was not met because the response was correct. In this case, you should return a json like this:

```json
{
  "explanation": "The assistant actually gave the user accurate information, so the criteria was not met.",
  "criteria_met": false
}
```

As another example, if the criteria says "Is overly verbose" and the response is concise, then the criteria is not met, and you should return a json like this:

```json
{
  "explanation": "The response is concise, so the criteria was not met.",
  "criteria_met": false
}
```

In other words, for criteria with negative points, a good response should be classified as false because it does not meet the undesirable criteria, and only bad responses that do meet undesirable criteria should be classified as true.

# Final instruction
Return just the json object in markdown format. Do not include any other text in the response."#;

/// Configuration for grader calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraderConfig {
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_system_prompt() -> String {
    DEFAULT_GRADER_SYSTEM_PROMPT.to_string()
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self { temperature: 0.0, system_prompt: default_system_prompt() }
    }
}

/// Parsed grader answer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraderVerdict {
    #[serde(default)]
    pub explanation: String,
    pub criteria_met: bool,
}

/// Verdict for one item plus the tokens spent on it
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub result: RubricResult,
    pub usage: TokenUsage,
}

/// Judge that grades single rubric items
#[derive(Clone)]
pub struct Grader {
    model: Arc<dyn ChatModel>,
    config: GraderConfig,
}

impl Grader {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model, config: GraderConfig::default() }
    }

    pub fn with_config(model: Arc<dyn ChatModel>, config: GraderConfig) -> Self {
        Self { model, config }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Grade `response` against one rubric item.
    ///
    /// Makes exactly one grader call. Call errors and unparseable replies
    /// both yield `criteria_met = false`.
    pub async fn grade_rubric_item(
        &self,
        conversation: &[Message],
        response: &str,
        item: &RubricItem,
    ) -> GradeOutcome {
        let prompt = build_grader_prompt(conversation, response, item);
        let request = ChatRequest::new(
            self.model.name(),
            vec![Message::system(self.config.system_prompt.clone()), Message::user(prompt)],
        )
        .with_temperature(self.config.temperature);

        let (verdict, usage) = match self.model.generate(request).await {
            Ok(reply) => {
                let verdict = parse_grader_response(&reply.text).unwrap_or_else(|e| {
                    tracing::warn!(criterion = %item.criterion, error = %e, "unparseable grader reply");
                    GraderVerdict { explanation: e.to_string(), criteria_met: false }
                });
                (verdict, reply.usage)
            }
            Err(e) => {
                tracing::warn!(criterion = %item.criterion, error = %e, "grader call failed");
                let explanation = EvalError::GradingError(format!("grader call failed: {e}")).to_string();
                (GraderVerdict { explanation, criteria_met: false }, TokenUsage::default())
            }
        };

        GradeOutcome {
            result: RubricResult {
                criterion: item.criterion.clone(),
                points: item.points,
                criteria_met: verdict.criteria_met,
                explanation: verdict.explanation,
                tags: item.tags.clone(),
            },
            usage,
        }
    }
}

/// Render a conversation as `role: content` turns ending with the response.
pub fn format_conversation(conversation: &[Message], response: &str) -> String {
    conversation
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .chain(std::iter::once(format!("assistant: {response}")))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_rubric_item(item: &RubricItem) -> String {
    format!("[{}] {}", item.points, item.criterion)
}

pub fn build_grader_prompt(conversation: &[Message], response: &str, item: &RubricItem) -> String {
    GRADER_TEMPLATE
        .replacen("<<rubric_item>>", &format_rubric_item(item), 1)
        .replacen("<<conversation>>", &format_conversation(conversation, response), 1)
}

/// Parse a grader reply into a verdict.
///
/// Accepts a bare object, an object inside a ```json fence, or an object
/// followed or preceded by prose.
pub fn parse_grader_response(text: &str) -> Result<GraderVerdict> {
    let body = strip_code_fence(text);
    let json = extract_json_object(body).ok_or_else(|| {
        EvalError::GradingError(format!("no JSON object in grader reply: {}", preview(text)))
    })?;
    serde_json::from_str(json).map_err(|e| {
        EvalError::GradingError(format!("failed to parse grader reply: {e}: {}", preview(text)))
    })
}

/// Unwrap a fence only when it encloses the whole reply. Backticks inside
/// an explanation string are left alone.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = after
        .strip_prefix("json")
        .or_else(|| after.strip_prefix("JSON"))
        .unwrap_or(after);
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// First balanced `{...}` span, ignoring braces inside strings. Falls back
/// to the first `{` through the last `}` when braces never balance.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn preview(text: &str) -> String {
    const MAX: usize = 200;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_json() {
        let verdict =
            parse_grader_response("```json\n{\"explanation\":\"x\",\"criteria_met\":true}\n```").unwrap();
        assert!(verdict.criteria_met);
        assert_eq!(verdict.explanation, "x");
    }

    #[test]
    fn test_parse_unlabeled_fence_and_bare_object() {
        let fenced = parse_grader_response("```\n{\"explanation\":\"y\",\"criteria_met\":false}\n```");
        assert!(!fenced.unwrap().criteria_met);

        let bare = parse_grader_response("{\"explanation\":\"z\",\"criteria_met\":true}");
        assert!(bare.unwrap().criteria_met);
    }

    #[test]
    fn test_parse_ignores_trailing_prose() {
        let reply = r#"{"explanation": "mentions {braces} in text", "criteria_met": true} I hope this helps! {not json}"#;
        let verdict = parse_grader_response(reply).unwrap();
        assert!(verdict.criteria_met);
        assert_eq!(verdict.explanation, "mentions {braces} in text");
    }

    #[test]
    fn test_parse_explanation_mentioning_code_fence() {
        let verdict =
            parse_grader_response(r#"{"explanation": "the reply used a ``` block", "criteria_met": true}"#).unwrap();
        assert!(verdict.criteria_met);
        assert_eq!(verdict.explanation, "the reply used a ``` block");

        let fenced = r#"```json
{"explanation": "see ```rust", "criteria_met": true}
```"#;
        let verdict = parse_grader_response(fenced).unwrap();
        assert!(verdict.criteria_met);
        assert_eq!(verdict.explanation, "see ```rust");
    }

    #[test]
    fn test_parse_leading_prose() {
        let reply = "Here is my verdict:\n{\"explanation\": \"quote \\\" inside\", \"criteria_met\": false}";
        let verdict = parse_grader_response(reply).unwrap();
        assert!(!verdict.criteria_met);
        assert_eq!(verdict.explanation, "quote \" inside");
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_grader_response("The response meets the criterion.").unwrap_err();
        assert!(err.to_string().contains("no JSON object"));
    }

    #[test]
    fn test_parse_rejects_non_boolean_verdict() {
        let err = parse_grader_response(r#"{"explanation": "x", "criteria_met": "yes"}"#).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_format_conversation() {
        let conversation = vec![Message::user("hi"), Message::assistant("hello"), Message::user("help")];
        assert_eq!(
            format_conversation(&conversation, "sure"),
            "user: hi\n\nassistant: hello\n\nuser: help\n\nassistant: sure"
        );
    }

    #[test]
    fn test_format_rubric_item() {
        assert_eq!(format_rubric_item(&RubricItem::new("Asks about fever", 5.0)), "[5] Asks about fever");
        assert_eq!(format_rubric_item(&RubricItem::new("Is rude", -2.5)), "[-2.5] Is rude");
    }

    #[test]
    fn test_prompt_substitutes_both_sections() {
        let prompt = build_grader_prompt(&[Message::user("q")], "a", &RubricItem::new("Answers", 1.0));
        assert!(prompt.contains("# Conversation\nuser: q\n\nassistant: a\n"));
        assert!(prompt.contains("# Rubric item\n[1] Answers\n"));
        assert!(!prompt.contains("<<"));
    }
}
