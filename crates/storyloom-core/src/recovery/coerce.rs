//! Coercion of parsed JSON values into a `StoryResponse`.

use super::TierFailure;
use crate::story::StoryResponse;
use serde_json::{Map, Value};

/// Builds a response from a parsed JSON document.
///
/// Only `story` is required. Everything else is coerced leniently so a model
/// that writes `"isEnding": "false"` or numeric choices still yields a turn.
pub(crate) fn response_from_value(value: Value) -> Result<StoryResponse, TierFailure> {
    let Value::Object(object) = value else {
        return Err(TierFailure::NotAnObject);
    };

    let story = object
        .get("story")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(TierFailure::MissingStory)?
        .to_string();

    Ok(StoryResponse {
        story,
        choices: object
            .get("choices")
            .map(choices_from_value)
            .unwrap_or_default(),
        is_ending: object.get("isEnding").map(bool_from_value).unwrap_or(false),
        ending_type: optional_string(&object, "endingType"),
        image_prompt: optional_string(&object, "imagePrompt"),
    })
}

pub(crate) fn choices_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(choice_text).collect(),
        _ => Vec::new(),
    }
}

fn choice_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn bool_from_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn optional_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_fields() {
        let response = response_from_value(json!({
            "story": "  A door creaks.  ",
            "choices": ["Open it", 42, null, true],
            "isEnding": "FALSE",
            "imagePrompt": 7
        }))
        .unwrap();

        assert_eq!(response.story, "A door creaks.");
        assert_eq!(response.choices, vec!["Open it", "42", "true"]);
        assert!(!response.is_ending);
        assert_eq!(response.image_prompt, None);
    }

    #[test]
    fn test_missing_story_fails() {
        assert_eq!(
            response_from_value(json!({"story": "   ", "choices": []})),
            Err(TierFailure::MissingStory)
        );
        assert_eq!(
            response_from_value(json!(["story"])),
            Err(TierFailure::NotAnObject)
        );
    }
}
