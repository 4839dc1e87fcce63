//! Parsers for the response shapes returned by the REST providers.
//!
//! Upstream payloads vary between API revisions, so each provider has one
//! parser that walks the shapes it knows in a fixed order and classifies the
//! first one that carries text.

use serde_json::Value;

use super::{ProviderError, ProviderResult};

/// Text extracted from a provider response, tagged with the shape it came from
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    /// `choices[0].message.content` or `choices[0].text`
    ChatChoice(String),
    /// `candidates[0].content`, plain or as `parts`
    CandidateContent(String),
    /// `output` entries whose content fragments are joined by newline
    OutputContentList(Vec<String>),
    /// A bare string at `output`, `output.text`/`output.content` or top-level `text`
    RawText(String),
}

impl ProviderResponse {
    pub fn into_text(self) -> String {
        match self {
            ProviderResponse::ChatChoice(t)
            | ProviderResponse::CandidateContent(t)
            | ProviderResponse::RawText(t) => t,
            ProviderResponse::OutputContentList(parts) => parts.join("\n"),
        }
    }
}

/// Gemini `generateContent` responses: `candidates[0].content`, then
/// `output.content`, then `output.text`
pub fn parse_gemini(value: &Value) -> ProviderResult<ProviderResponse> {
    if let Some(content) = value.pointer("/candidates/0/content") {
        if let Some(text) = content_text(content) {
            return Ok(ProviderResponse::CandidateContent(text));
        }
    }
    if let Some(output) = value.get("output") {
        for field in ["content", "text"] {
            if let Some(text) = output.get(field).and_then(content_text) {
                return Ok(ProviderResponse::RawText(text));
            }
        }
    }
    Err(ProviderError::Protocol(format!(
        "no candidates or output text in gemini response (keys: {})",
        top_level_keys(value)
    )))
}

/// Responses-style APIs: `output`, then top-level `text`, then `choices[0]`
pub fn parse_responses(value: &Value) -> ProviderResult<ProviderResponse> {
    match value.get("output") {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            return Ok(ProviderResponse::RawText(s.clone()));
        }
        Some(Value::Object(obj)) => {
            for field in ["text", "content"] {
                if let Some(text) = obj.get(field).and_then(content_text) {
                    return Ok(ProviderResponse::RawText(text));
                }
            }
        }
        Some(Value::Array(entries)) => {
            let parts: Vec<String> = entries.iter().filter_map(output_entry_text).collect();
            if !parts.is_empty() {
                return Ok(ProviderResponse::OutputContentList(parts));
            }
        }
        _ => {}
    }

    if let Some(Value::String(s)) = value.get("text") {
        if !s.trim().is_empty() {
            return Ok(ProviderResponse::RawText(s.clone()));
        }
    }

    if let Some(choice) = value.pointer("/choices/0") {
        let text = choice
            .get("text")
            .and_then(Value::as_str)
            .or_else(|| choice.pointer("/message/content").and_then(Value::as_str));
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            return Ok(ProviderResponse::ChatChoice(text.to_string()));
        }
    }

    Err(ProviderError::Protocol(format!(
        "no output, text or choices in response (keys: {})",
        top_level_keys(value)
    )))
}

/// Text of one `output` entry: `content` or `message.content`
fn output_entry_text(entry: &Value) -> Option<String> {
    entry
        .get("content")
        .and_then(content_text)
        .or_else(|| entry.pointer("/message/content").and_then(content_text))
}

/// Flatten a content value that may be a string, an object carrying
/// `text`/`content`/`parts`, or a list of such fragments
fn content_text(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(fragments) => {
            let parts: Vec<String> = fragments.iter().filter_map(content_text).collect();
            parts.join("\n")
        }
        Value::Object(obj) => {
            if let Some(t) = obj.get("text").and_then(Value::as_str) {
                t.to_string()
            } else if let Some(inner) = obj.get("parts").or_else(|| obj.get("content")) {
                return content_text(inner);
            } else {
                return None;
            }
        }
        _ => return None,
    };
    if text.trim().is_empty() { None } else { Some(text) }
}

fn top_level_keys(value: &Value) -> String {
    match value.as_object() {
        Some(obj) => obj.keys().cloned().collect::<Vec<_>>().join(", "),
        None => "<not an object>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gemini_candidate_parts() {
        let v = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Brush twice a week."}, {"text": "Use a slicker brush."}], "role": "model"}
            }]
        });
        let parsed = parse_gemini(&v).unwrap();
        assert_eq!(
            parsed,
            ProviderResponse::CandidateContent("Brush twice a week.\nUse a slicker brush.".into())
        );
    }

    #[test]
    fn test_gemini_candidate_plain_string() {
        let v = json!({"candidates": [{"content": "Short answer"}]});
        assert_eq!(parse_gemini(&v).unwrap().into_text(), "Short answer");
    }

    #[test]
    fn test_gemini_output_fallbacks() {
        let v = json!({"output": {"content": "from content"}});
        assert_eq!(parse_gemini(&v).unwrap(), ProviderResponse::RawText("from content".into()));

        let v = json!({"output": {"text": "from text"}});
        assert_eq!(parse_gemini(&v).unwrap().into_text(), "from text");

        // empty candidate content falls through to output
        let v = json!({"candidates": [{"content": {"parts": []}}], "output": {"text": "late"}});
        assert_eq!(parse_gemini(&v).unwrap().into_text(), "late");
    }

    #[test]
    fn test_gemini_rejects_textless_response() {
        let v = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = parse_gemini(&v).unwrap_err();
        assert!(matches!(err, ProviderError::Protocol(msg) if msg.contains("promptFeedback")));
    }

    #[test]
    fn test_responses_output_string_and_object() {
        assert_eq!(
            parse_responses(&json!({"output": "plain"})).unwrap(),
            ProviderResponse::RawText("plain".into())
        );
        assert_eq!(
            parse_responses(&json!({"output": {"content": "obj"}})).unwrap().into_text(),
            "obj"
        );
    }

    #[test]
    fn test_responses_output_list_of_fragments() {
        let v = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "Walk daily."},
                    {"type": "output_text", "text": "Play fetch."}
                ]},
                {"message": {"content": "Rest after meals."}}
            ]
        });
        let parsed = parse_responses(&v).unwrap();
        assert_eq!(
            parsed,
            ProviderResponse::OutputContentList(vec![
                "Walk daily.\nPlay fetch.".into(),
                "Rest after meals.".into()
            ])
        );
        assert_eq!(parsed.into_text(), "Walk daily.\nPlay fetch.\nRest after meals.");
    }

    #[test]
    fn test_responses_text_then_choices() {
        assert_eq!(
            parse_responses(&json!({"output": [], "text": "top"})).unwrap(),
            ProviderResponse::RawText("top".into())
        );
        assert_eq!(
            parse_responses(&json!({"choices": [{"text": "legacy"}]})).unwrap(),
            ProviderResponse::ChatChoice("legacy".into())
        );
        assert_eq!(
            parse_responses(&json!({"choices": [{"message": {"role": "assistant", "content": "chat"}}]}))
                .unwrap(),
            ProviderResponse::ChatChoice("chat".into())
        );
    }

    #[test]
    fn test_responses_rejects_blank_everything() {
        let v = json!({"output": "  ", "text": "", "choices": [{"text": " "}]});
        assert!(matches!(parse_responses(&v), Err(ProviderError::Protocol(_))));
        assert!(matches!(parse_responses(&json!([1, 2])), Err(ProviderError::Protocol(_))));
    }
}
