//! Best-effort JSON recovery from model output.
//!
//! Models wrap JSON in code fences, surround it with prose, or emit raw
//! newlines inside string literals. These helpers peel all of that off
//! without ever failing loudly.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static LEADING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("valid regex"));
static TRAILING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?```\s*$").expect("valid regex"));

/// Remove a leading ```` ```json ```` fence line and a trailing fence.
pub fn strip_code_fences(text: &str) -> String {
    let s = text.trim();
    if !s.starts_with("```") {
        return s.to_string();
    }
    let s = LEADING_FENCE_RE.replace(s, "");
    TRAILING_FENCE_RE.replace(&s, "").trim().to_string()
}

/// Widest `{ ... }` span: first opening brace to last closing brace.
pub fn largest_brace_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Escape raw control characters that appear inside JSON string literals.
///
/// Text outside string literals is left untouched, as are existing escape
/// sequences.
pub fn escape_control_chars_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out
}

fn parse_object(s: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Try hard to turn model text into a JSON object.
///
/// Order: fence stripping, direct parse, largest brace block; each step is
/// also retried with control characters escaped. Returns `None` when
/// nothing parses to an object.
pub fn coerce_object(text: &str) -> Option<Map<String, Value>> {
    let s = strip_code_fences(text);
    if s.is_empty() {
        return None;
    }

    let mut candidates = vec![s.clone()];
    if let Some(block) = largest_brace_block(&s) {
        if block != s {
            candidates.push(block.to_string());
        }
    }

    candidates.iter().find_map(|c| {
        parse_object(c).or_else(|| parse_object(&escape_control_chars_in_strings(c)))
    })
}

/// Clean model text so that it parses as JSON if at all possible.
///
/// Returns the cleaned text either way; callers check parseability.
pub fn clean_json_text(text: &str) -> String {
    let s = strip_code_fences(text);
    if serde_json::from_str::<Value>(&s).is_ok() {
        return s;
    }
    let candidate = largest_brace_block(&s).unwrap_or(&s);
    escape_control_chars_in_strings(candidate)
}

/// Whether text is a complete JSON document.
pub fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let obj = coerce_object(r#"{"client": "Acme"}"#).unwrap();
        assert_eq!(obj["client"], "Acme");
    }

    #[test]
    fn strips_json_fences() {
        let obj = coerce_object("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(obj["a"], 1);
    }

    #[test]
    fn extracts_object_from_prose() {
        let obj = coerce_object("Sure! Here it is:\n{\"a\": {\"b\": 2}}\nHope that helps.").unwrap();
        assert_eq!(obj["a"]["b"], 2);
    }

    #[test]
    fn escapes_raw_newlines_in_strings() {
        let raw = "{\"summary\": \"line one\nline two\"}";
        let obj = coerce_object(raw).unwrap();
        assert_eq!(obj["summary"], "line one\nline two");
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(coerce_object("[1, 2, 3]").is_none());
        assert!(coerce_object("\"just a string\"").is_none());
    }

    #[test]
    fn garbage_returns_none() {
        assert!(coerce_object("no json here").is_none());
        assert!(coerce_object("").is_none());
        assert!(coerce_object("{ broken").is_none());
    }

    #[test]
    fn escape_leaves_structure_alone() {
        let raw = "{\n  \"a\": \"x\ty\",\n  \"b\": \"q\\\"uote\"\n}";
        let fixed = escape_control_chars_in_strings(raw);
        assert!(fixed.starts_with("{\n"));
        assert!(fixed.contains("x\\ty"));
        assert!(fixed.contains("q\\\"uote"));
        assert!(is_valid_json(&fixed));
    }

    #[test]
    fn clean_json_text_repairs_fenced_payload() {
        let raw = "```json\n{\"tasks\": \"- a\n- b\"}\n```";
        let cleaned = clean_json_text(raw);
        assert!(is_valid_json(&cleaned));
    }
}
