//! Answer-text extraction from chat-completion payloads.
//!
//! Providers disagree on where the text lives. Rules, first match wins:
//!
//! 1. `choices[0]`: take `delta`, else `message`, else the choice itself.
//!    A string is the text; otherwise its `content` (flattened), else its
//!    `text`.
//! 2. Without a `choices` array: top-level `message.content`, then
//!    `delta.content`, then `content`.
//!
//! `content` may be a string, an object with `text`, or a list of parts
//! where each part is a string or an object with `text`.

use serde_json::Value;

/// Text carried by one payload, or `None` when there is nothing to emit.
pub fn extract_text(payload: &Value) -> Option<String> {
    let text = match payload.get("choices") {
        Some(Value::Array(choices)) => choices.first().and_then(from_choice),
        _ => ["message", "delta"]
            .iter()
            .find_map(|key| {
                payload
                    .get(key)
                    .and_then(|v| v.get("content"))
                    .and_then(flatten)
                    .filter(|t| !t.is_empty())
            })
            .or_else(|| payload.get("content").and_then(flatten)),
    };
    text.filter(|t| !t.is_empty())
}

fn from_choice(choice: &Value) -> Option<String> {
    let body = ["delta", "message"]
        .iter()
        .find_map(|key| choice.get(key).filter(|v| !v.is_null()))
        .unwrap_or(choice);

    if let Value::String(s) = body {
        return Some(s.clone());
    }
    body.get("content")
        .and_then(flatten)
        .filter(|t| !t.is_empty())
        .or_else(|| body.get("text").and_then(Value::as_str).map(str::to_owned))
}

fn flatten(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => Some(parts.iter().filter_map(part_text).collect()),
        Value::Object(_) => content.get("text").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

fn part_text(part: &Value) -> Option<&str> {
    match part {
        Value::String(s) => Some(s),
        _ => part.get("text").and_then(Value::as_str),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(v: Value) -> Option<String> {
        extract_text(&v)
    }

    #[test]
    fn openai_delta() {
        assert_eq!(text(json!({"choices":[{"delta":{"content":"Hi"}}]})).as_deref(), Some("Hi"));
    }

    #[test]
    fn full_message() {
        let v = json!({"choices":[{"index":0,"message":{"role":"assistant","content":"done"}}]});
        assert_eq!(text(v).as_deref(), Some("done"));
    }

    #[test]
    fn delta_preferred_over_message() {
        let v = json!({"choices":[{"delta":{"content":"d"},"message":{"content":"m"}}]});
        assert_eq!(text(v).as_deref(), Some("d"));
    }

    #[test]
    fn null_delta_falls_through_to_message() {
        let v = json!({"choices":[{"delta":null,"message":{"content":"m"}}]});
        assert_eq!(text(v).as_deref(), Some("m"));
    }

    #[test]
    fn legacy_completion_text() {
        assert_eq!(text(json!({"choices":[{"text":"abc","index":0}]})).as_deref(), Some("abc"));
    }

    #[test]
    fn string_choice() {
        assert_eq!(text(json!({"choices":[{"delta":"raw"}]})).as_deref(), Some("raw"));
    }

    #[test]
    fn content_parts_are_concatenated() {
        let v = json!({"choices":[{"delta":{"content":["a", {"type":"text","text":"b"}, {"type":"image"}, "c"]}}]});
        assert_eq!(text(v).as_deref(), Some("abc"));
    }

    #[test]
    fn empty_content_falls_back_to_text() {
        let v = json!({"choices":[{"delta":{"content":"","text":"t"}}]});
        assert_eq!(text(v).as_deref(), Some("t"));
    }

    #[test]
    fn only_first_choice_counts() {
        let v = json!({"choices":[{"delta":{}}, {"delta":{"content":"second"}}]});
        assert_eq!(text(v), None);
    }

    #[test]
    fn top_level_shapes() {
        assert_eq!(text(json!({"message":{"content":"m"}})).as_deref(), Some("m"));
        assert_eq!(text(json!({"delta":{"content":[{"text":"d"}]}})).as_deref(), Some("d"));
        assert_eq!(text(json!({"content":"c"})).as_deref(), Some("c"));
        assert_eq!(text(json!({"content":{"text":"o"}})).as_deref(), Some("o"));
    }

    #[test]
    fn nothing_to_extract() {
        assert_eq!(text(json!({"choices":[]})), None);
        assert_eq!(text(json!({"choices":[{"delta":{"role":"assistant"}}]})), None);
        assert_eq!(text(json!({"usage":{"total_tokens":3}})), None);
        assert_eq!(text(json!(null)), None);
        assert_eq!(text(json!({"choices":[{"finish_reason":"stop","delta":{}}]})), None);
    }
}
