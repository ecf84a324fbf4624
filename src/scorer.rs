//! Self-scoring: ask the completion service to grade its own output.
//!
//! The grading reply is free text that should contain a JSON record. It is
//! parsed defensively: strict JSON first, a per-criterion regex fallback
//! second, and the raw text is never executed or propagated as an error.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::chat::{ChatMessage, ChatProvider, GenerationParams};
use crate::sweep::{EvaluationRequest, GeneratedResponse};

/// Temperature and token budget for grading calls, fixed so score replies
/// stay short and deterministic.
const SCORING_TEMPERATURE: f32 = 0.0;
const SCORING_MAX_TOKENS: u32 = 300;

const SCORER_SYSTEM_PROMPT: &str = "You are a strict evaluator of model outputs.";

/// Parsed grades for one generated response.
///
/// Numeric fields are 1-10 when present; out-of-range replies are clamped
/// into that range. Absent means the value could not be extracted, never the
/// lowest score. `parse_succeeded` is true only when the reply carried a
/// well-formed JSON record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreRecord {
    pub clarity: Option<u8>,
    pub specificity: Option<u8>,
    pub third_criterion: Option<u8>,
    pub comments: Option<String>,
    pub parse_succeeded: bool,
}

impl ScoreRecord {
    /// Record for a response that was never graded (failed generation or
    /// failed scoring call); the reason lands in `comments`.
    pub fn unscored(reason: impl Into<String>) -> Self {
        Self {
            comments: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Grades generated responses by calling the same completion service again.
pub struct Scorer {
    provider: Arc<dyn ChatProvider>,
    third_criterion: String,
}

impl Scorer {
    pub fn new(provider: Arc<dyn ChatProvider>, third_criterion: impl Into<String>) -> Self {
        Self {
            provider,
            third_criterion: third_criterion.into(),
        }
    }

    /// Asks the service to rate `response` against the named criteria.
    ///
    /// Never returns an error: a failed grading call or an unparseable reply
    /// both produce a record with `parse_succeeded == false`.
    pub async fn score(
        &self,
        request: &EvaluationRequest,
        response: &GeneratedResponse,
    ) -> ScoreRecord {
        if response.is_degraded() {
            return ScoreRecord::unscored("not scored: generation failed");
        }
        if response.text.is_empty() {
            return ScoreRecord::unscored("not scored: empty response");
        }

        let messages = [
            ChatMessage::system().content(SCORER_SYSTEM_PROMPT).build(),
            ChatMessage::user()
                .content(self.build_prompt(&request.prompt, &response.text))
                .build(),
        ];
        let params = GenerationParams::new(
            request.model.clone(),
            SCORING_TEMPERATURE,
            SCORING_MAX_TOKENS,
        );

        match self.provider.chat(&messages, &params).await {
            Ok(reply) => parse_score_reply(&reply, &self.third_criterion),
            Err(err) => {
                log::warn!("scoring call failed for request {}: {err}", request.index);
                ScoreRecord::unscored(format!("scoring failed: {err}"))
            }
        }
    }

    fn build_prompt(&self, prompt: &str, response: &str) -> String {
        format!(
            "Evaluate the response to this prompt:\n\
             Prompt: \"{prompt}\"\n\n\
             Response:\n{response}\n\n\
             Score the response from 1-10 in the following categories:\n\
             - Clarity\n\
             - Specificity\n\
             - {third}\n\n\
             Return JSON like:\n\
             {{\n\
               \"Clarity\": 8,\n\
               \"Specificity\": 7,\n\
               \"{third}\": 6,\n\
               \"Comments\": \"Short and precise, but lacks vivid examples.\"\n\
             }}",
            third = self.third_criterion,
        )
    }
}

/// Parses a grading reply into a [`ScoreRecord`].
///
/// Strict path: locate a JSON object in the reply (code fences tolerated)
/// and read the criterion fields case-insensitively. Fallback path: extract
/// per-criterion numbers from lines like `Clarity: 8`; the record keeps the
/// raw reply in `comments` and reports `parse_succeeded == false`.
pub fn parse_score_reply(reply: &str, third_criterion: &str) -> ScoreRecord {
    if let Some(value) = extract_json_object(reply) {
        if let Value::Object(map) = value {
            let comments = lookup(&map, "comments")
                .and_then(|v| v.as_str().map(str::to_string));
            return ScoreRecord {
                clarity: lookup(&map, "clarity").and_then(numeric_score),
                specificity: lookup(&map, "specificity").and_then(numeric_score),
                third_criterion: lookup(&map, third_criterion).and_then(numeric_score),
                comments,
                parse_succeeded: true,
            };
        }
    }

    ScoreRecord {
        clarity: regex_score(reply, "Clarity"),
        specificity: regex_score(reply, "Specificity"),
        third_criterion: regex_score(reply, third_criterion),
        comments: Some(reply.trim().to_string()),
        parse_succeeded: false,
    }
}

/// Finds the outermost `{...}` span, stripping markdown code fences first.
fn extract_json_object(reply: &str) -> Option<Value> {
    let stripped = reply.replace("```json", "").replace("```", "");
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&stripped[start..=end]).ok()
}

fn lookup<'a>(map: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Accepts integer, float, or numeric-string fields; anything else is absent.
fn numeric_score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    // "NaN" parses as f64 and would clamp to 0, below the 1-10 range.
    if !n.is_finite() {
        return None;
    }
    Some(clamp_score(n))
}

/// Clamps into the documented 1-10 range.
fn clamp_score(n: f64) -> u8 {
    n.round().clamp(1.0, 10.0) as u8
}

fn regex_score(reply: &str, criterion: &str) -> Option<u8> {
    let pattern = format!(r"(?i)\b{}\b[^0-9+-]{{0,20}}(-?\d+)", regex::escape(criterion));
    let re = Regex::new(&pattern).ok()?;
    let captures = re.captures(reply)?;
    let n: f64 = captures.get(1)?.as_str().parse().ok()?;
    Some(clamp_score(n))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn strict_json_reply_parses() {
        let reply = r#"{"Clarity": 8, "Specificity": 7, "Verbosity": 6, "Comments": "Short and precise."}"#;
        let record = parse_score_reply(reply, "Verbosity");
        assert!(record.parse_succeeded);
        assert_eq!(record.clarity, Some(8));
        assert_eq!(record.specificity, Some(7));
        assert_eq!(record.third_criterion, Some(6));
        assert_eq!(record.comments.as_deref(), Some("Short and precise."));
    }

    #[test]
    fn fenced_json_with_prose_parses() {
        let reply = "Here is my evaluation:\n```json\n{\"clarity\": 9, \"specificity\": 5, \"Relevance\": 7}\n```\nHope that helps!";
        let record = parse_score_reply(reply, "Relevance");
        assert!(record.parse_succeeded);
        assert_eq!(record.clarity, Some(9));
        assert_eq!(record.third_criterion, Some(7));
        assert_eq!(record.comments, None);
    }

    #[test]
    fn malformed_record_falls_back_to_regex() {
        let reply = "Clarity: 8\nSpecificity: 7\nVerbosity: not sure";
        let record = parse_score_reply(reply, "Verbosity");
        assert!(!record.parse_succeeded);
        assert_eq!(record.clarity, Some(8));
        assert_eq!(record.specificity, Some(7));
        assert_eq!(record.third_criterion, None);
        assert_eq!(record.comments.as_deref(), Some(reply));
    }

    #[test]
    fn garbage_reply_never_panics() {
        let record = parse_score_reply("I refuse to grade this.", "Verbosity");
        assert!(!record.parse_succeeded);
        assert_eq!(record.clarity, None);
        assert_eq!(record.specificity, None);
        assert_eq!(record.third_criterion, None);
        assert!(record.comments.is_some());
    }

    #[rstest]
    #[case(15.0, 10)]
    #[case(-3.0, 1)]
    #[case(0.0, 1)]
    #[case(10.0, 10)]
    #[case(1.0, 1)]
    #[case(7.0, 7)]
    fn scores_clamp_into_range(#[case] input: f64, #[case] expected: u8) {
        assert_eq!(clamp_score(input), expected);
    }

    #[test]
    fn out_of_range_json_scores_are_clamped() {
        let reply = r#"{"Clarity": 15, "Specificity": -3, "Verbosity": 6}"#;
        let record = parse_score_reply(reply, "Verbosity");
        assert!(record.parse_succeeded);
        assert_eq!(record.clarity, Some(10));
        assert_eq!(record.specificity, Some(1));
    }

    #[test]
    fn numeric_string_fields_are_accepted() {
        let reply = r#"{"Clarity": "8", "Specificity": true, "Verbosity": 6.4}"#;
        let record = parse_score_reply(reply, "Verbosity");
        assert_eq!(record.clarity, Some(8));
        // Non-numeric becomes absent, not zero.
        assert_eq!(record.specificity, None);
        assert_eq!(record.third_criterion, Some(6));
    }

    #[test]
    fn non_finite_string_scores_are_absent() {
        let reply = r#"{"Clarity": "NaN", "Specificity": "inf", "Verbosity": "-inf"}"#;
        let record = parse_score_reply(reply, "Verbosity");
        assert!(record.parse_succeeded);
        assert_eq!(record.clarity, None);
        assert_eq!(record.specificity, None);
        assert_eq!(record.third_criterion, None);
    }

    #[tokio::test]
    async fn empty_and_failed_responses_get_distinct_reasons() {
        use std::sync::Arc;

        use async_trait::async_trait;

        use crate::chat::{ChatMessage, ChatProvider, GenerationParams};
        use crate::error::SweepError;
        use crate::sweep::{EvaluationRequest, GeneratedResponse};

        struct NoCallProvider;

        #[async_trait]
        impl ChatProvider for NoCallProvider {
            async fn chat(
                &self,
                _messages: &[ChatMessage],
                _params: &GenerationParams,
            ) -> Result<String, SweepError> {
                panic!("ungraded responses must not trigger a scoring call");
            }
        }

        let scorer = Scorer::new(Arc::new(NoCallProvider), "Verbosity");
        let request = EvaluationRequest {
            index: 0,
            prompt: "p".to_string(),
            model: "m".to_string(),
            temperature: 0.2,
            max_tokens: 50,
        };

        let empty = GeneratedResponse {
            text: String::new(),
            latency_ms: 1,
            error: None,
        };
        let record = scorer.score(&request, &empty).await;
        assert_eq!(record.comments.as_deref(), Some("not scored: empty response"));

        let degraded = GeneratedResponse {
            text: String::new(),
            latency_ms: 1,
            error: Some("Provider error: 503".to_string()),
        };
        let record = scorer.score(&request, &degraded).await;
        assert_eq!(
            record.comments.as_deref(),
            Some("not scored: generation failed")
        );
    }

    #[test]
    fn unscored_record_carries_reason() {
        let record = ScoreRecord::unscored("scoring failed: timeout");
        assert!(!record.parse_succeeded);
        assert_eq!(record.comments.as_deref(), Some("scoring failed: timeout"));
        assert_eq!(record.clarity, None);
    }
}
