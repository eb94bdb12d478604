//! Text-level repairs shared by the recovery tiers.

use once_cell::sync::Lazy;
use regex::Regex;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:json)?").expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));
static MISSING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([}\]])(\s*)([{\[])").expect("valid regex"));

/// Removes markdown code fences and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Returns the slice from the first `{` to its matching `}`.
///
/// The first pass honours string literals so braces inside story text do not
/// count. If quoting is too broken for that pass to close the object, a plain
/// depth count is tried, and a truncated object yields everything from the
/// opening brace to the end of the text.
pub fn find_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let tail = &text[start..];

    let end = matching_brace(tail, true)
        .or_else(|| matching_brace(tail, false))
        .unwrap_or(tail.len() - 1);

    Some(&tail[..=end])
}

fn matching_brace(text: &str, string_aware: bool) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if string_aware && in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if string_aware => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }

    None
}

/// Applies the structural clean-up used before the second parse attempt.
///
/// Control characters become spaces, whitespace runs collapse to one space,
/// trailing commas before `}`/`]` are dropped and commas are inserted between
/// adjacent `}`/`{` or `]`/`[` pairs.
pub fn clean_structure(candidate: &str) -> String {
    let without_controls: String = candidate
        .chars()
        .map(|c| if is_stray_control(c) { ' ' } else { c })
        .collect();

    let collapsed = WHITESPACE_RUN.replace_all(&without_controls, " ");
    let without_trailing = TRAILING_COMMA.replace_all(&collapsed, "${1}");
    MISSING_COMMA
        .replace_all(&without_trailing, "${1},${2}${3}")
        .into_owned()
}

fn is_stray_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1F}' | '\u{7F}'..='\u{9F}')
}

/// Decodes JSON string escapes in a captured string body.
///
/// Unknown escapes are kept verbatim and lone surrogates decode to U+FFFD.
pub fn unescape_json_string(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{c}'),
            Some('b') => out.push('\u{8}'),
            Some('u') => match read_hex4(&mut chars) {
                Some(high @ 0xD800..=0xDBFF) => {
                    let low = read_low_surrogate(&mut chars);
                    let decoded = low
                        .map(|low| 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
                        .and_then(char::from_u32);
                    out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                Some(code) => out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)),
                None => out.push_str("\\u"),
            },
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn read_hex4(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u32> {
    let lookahead: String = chars.clone().take(4).collect();
    if lookahead.len() != 4 || !lookahead.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    for _ in 0..4 {
        chars.next();
    }
    u32::from_str_radix(&lookahead, 16).ok()
}

fn read_low_surrogate(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u32> {
    let mut probe = chars.clone();
    if probe.next() != Some('\\') || probe.next() != Some('u') {
        return None;
    }
    let code = read_hex4(&mut probe)?;
    if !(0xDC00..=0xDFFF).contains(&code) {
        return None;
    }
    *chars = probe;
    Some(code)
}
