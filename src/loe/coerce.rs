//! Primitive value coercers.
//!
//! Generator output is untrusted: every function here accepts any JSON value
//! and returns a typed result, treating `null`, `""` and `TBD` as unknown
//! rather than zero or false.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static LIST_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n,;]+").expect("valid regex"));

/// Display form of a scalar without JSON quoting.
fn scalar_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_unknown_token(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s == "TBD" || s == "tbd"
}

/// Free-text list: arrays keep their items, strings are split on
/// newlines, commas and semicolons.
pub fn to_array(v: &Value) -> Vec<String> {
    match v {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(|i| scalar_text(i).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        other => LIST_SPLIT_RE
            .split(&scalar_text(other))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Robust trim: strings are trimmed, lists joined with `", "`.
pub fn trim(v: &Value) -> String {
    match v {
        Value::Array(items) => items
            .iter()
            .map(|i| scalar_text(i).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other).trim().to_string(),
    }
}

/// Trim a field that may be missing from its parent mapping.
pub fn trim_opt(v: Option<&Value>) -> String {
    v.map(trim).unwrap_or_default()
}

/// Lenient integer parse. Integral floats are accepted, fractions are not.
pub fn to_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.is_finite()).map(|f| f as i64)),
        Value::String(s) if !is_unknown_token(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn to_int_opt(v: Option<&Value>) -> Option<i64> {
    v.and_then(to_int)
}

/// Lenient float parse with the same sentinels as [`to_int`].
pub fn to_float(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) if !is_unknown_token(s) => {
            s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

pub fn to_float_opt(v: Option<&Value>) -> Option<f64> {
    v.and_then(to_float)
}

/// Quantity: a non-negative integer, `0` when unknown.
pub fn to_qty(v: Option<&Value>) -> u32 {
    to_int_opt(v)
        .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Tri-state boolean: yes/no style strings are understood, anything else
/// is unknown.
pub fn to_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Some(true),
            "false" | "no" | "n" | "0" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn to_bool_opt(v: Option<&Value>) -> Option<bool> {
    v.and_then(to_bool)
}

/// JSON truthiness, for flags that are plain booleans in the schema.
pub fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// `{"start": "May", "go_live": "June"}` becomes `start: May; go live: June`.
pub fn stringify_mapping(v: &Value) -> String {
    match v {
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| {
                let value = trim(v);
                if value.is_empty() {
                    None
                } else {
                    Some(format!("{}: {}", k.trim().replace('_', " "), value))
                }
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => trim(other),
    }
}

/// Lower-case slug with runs of non-alphanumerics collapsed to `-`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Cut to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_array_splits_strings() {
        assert_eq!(to_array(&json!("a, b;c\nd")), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn to_array_keeps_list_items() {
        assert_eq!(to_array(&json!([" a ", "", 3, null])), vec!["a", "3"]);
    }

    #[test]
    fn to_array_null_is_empty() {
        assert!(to_array(&Value::Null).is_empty());
    }

    #[test]
    fn trim_joins_lists() {
        assert_eq!(trim(&json!(["x", " ", "y"])), "x, y");
        assert_eq!(trim(&json!("  z ")), "z");
        assert_eq!(trim(&json!(4)), "4");
        assert_eq!(trim(&Value::Null), "");
    }

    #[test]
    fn to_int_rejects_sentinels() {
        assert_eq!(to_int(&json!("TBD")), None);
        assert_eq!(to_int(&json!("tbd")), None);
        assert_eq!(to_int(&json!("")), None);
        assert_eq!(to_int(&Value::Null), None);
        assert_eq!(to_int(&json!(" 12 ")), Some(12));
        assert_eq!(to_int(&json!(7)), Some(7));
        assert_eq!(to_int(&json!(7.0)), Some(7));
        assert_eq!(to_int(&json!(7.5)), None);
        assert_eq!(to_int(&json!("seven")), None);
    }

    #[test]
    fn to_float_parses_strings() {
        assert_eq!(to_float(&json!("1.5")), Some(1.5));
        assert_eq!(to_float(&json!(2)), Some(2.0));
        assert_eq!(to_float(&json!("TBD")), None);
    }

    #[test]
    fn to_qty_never_negative() {
        assert_eq!(to_qty(Some(&json!(-3))), 0);
        assert_eq!(to_qty(Some(&json!("4"))), 4);
        assert_eq!(to_qty(None), 0);
    }

    #[test]
    fn to_bool_understands_yes_no() {
        assert_eq!(to_bool(&json!("Yes")), Some(true));
        assert_eq!(to_bool(&json!(" off ")), Some(false));
        assert_eq!(to_bool(&json!(true)), Some(true));
        assert_eq!(to_bool(&json!("maybe")), None);
        assert_eq!(to_bool(&json!(1)), None);
    }

    #[test]
    fn stringify_mapping_formats_pairs() {
        let v = json!({"start_date": "May", "end": "", "go_live": "June"});
        assert_eq!(stringify_mapping(&v), "start date: May; go live: June");
        assert_eq!(stringify_mapping(&json!(" 2 weeks ")), "2 weeks");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  London HQ / Floor 3 "), "london-hq-floor-3");
        assert_eq!(slugify("***"), "");
    }
}
