//! Field-by-field regex extraction for text no JSON parser accepts.

use super::TierFailure;
use super::coerce::choices_from_value;
use super::text::unescape_json_string;
use crate::story::StoryResponse;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("valid regex")
}

// A value running up to the next known key or the closing brace. Keeps
// unescaped inner quotes, as long as the body does not swallow another key.
static STORY_BEFORE_KEY: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r#"(?s)"story"\s*:\s*"(.*?)"\s*(?:,\s*['"](?:choices|isEnding|imagePrompt|endingType)['"]|\}\s*$)"#,
    )
});
static SWALLOWED_KEY: Lazy<Regex> = Lazy::new(|| pattern(r#""\s*,\s*"\w+"\s*:"#));
// Ordered: properly quoted, single quoted, then an unterminated string
// running to the end of a truncated response.
static STORY_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        pattern(r#"(?s)"story"\s*:\s*"((?:[^"\\]|\\.)*)""#),
        pattern(r#"(?s)['"]story['"]\s*:\s*'((?:[^'\\]|\\.)*)'"#),
        pattern(r#"(?s)"story"\s*:\s*"((?:[^"\\]|\\.)*)$"#),
    ]
});
static CHOICES: Lazy<Regex> = Lazy::new(|| pattern(r#"(?s)"choices"\s*:\s*\[(.*?)\]"#));
static QUOTED: Lazy<Regex> = Lazy::new(|| pattern(r#""((?:[^"\\]|\\.)*)""#));
static IS_ENDING: Lazy<Regex> = Lazy::new(|| pattern(r#""isEnding"\s*:\s*(true|false)"#));
static IMAGE_PROMPT: Lazy<Regex> =
    Lazy::new(|| pattern(r#"(?s)"imagePrompt"\s*:\s*"((?:[^"\\]|\\.)*)""#));
static ENDING_TYPE: Lazy<Regex> =
    Lazy::new(|| pattern(r#""endingType"\s*:\s*"((?:[^"\\]|\\.)*)""#));

/// Extracts each field independently from `text`.
pub(crate) fn extract_fields(text: &str) -> Result<StoryResponse, TierFailure> {
    let story = extract_story(text).ok_or(TierFailure::NoStoryField)?;

    Ok(StoryResponse {
        story,
        choices: extract_choices(text),
        is_ending: IS_ENDING
            .captures(text)
            .is_some_and(|caps| &caps[1] == "true"),
        ending_type: capture_string(&ENDING_TYPE, text),
        image_prompt: capture_string(&IMAGE_PROMPT, text),
    })
}

fn extract_story(text: &str) -> Option<String> {
    let anchored = STORY_BEFORE_KEY
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str())
        .filter(|body| !SWALLOWED_KEY.is_match(body));

    anchored
        .into_iter()
        .chain(
            STORY_PATTERNS
                .iter()
                .filter_map(|regex| Some(regex.captures(text)?.get(1)?.as_str())),
        )
        .find_map(|body| {
            let story = unescape_json_string(body).trim().to_string();
            (!story.is_empty()).then_some(story)
        })
}

fn extract_choices(text: &str) -> Vec<String> {
    let Some(body) = CHOICES.captures(text).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };
    let body = body.as_str();

    match serde_json::from_str::<Value>(&format!("[{body}]")) {
        Ok(array) => choices_from_value(&array),
        Err(_) => QUOTED
            .captures_iter(body)
            .map(|caps| unescape_json_string(&caps[1]))
            .collect(),
    }
}

fn capture_string(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .map(|caps| unescape_json_string(&caps[1]))
}
