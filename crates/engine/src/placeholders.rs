//! Placeholder resolution
//!
//! Step values may carry `{{key}}` markers resolved against the current
//! collector, plus the loop tokens `{{i}}` (zero-based) and `{{i_plus1}}`
//! (one-based) bound to the nearest enclosing foreach. Substitution is a
//! single pass: a substituted value is never re-scanned, and a string
//! without markers comes back untouched.

use crate::collector::Collector;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("valid placeholder regex"));

static UNSAFE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\s_-]").expect("valid sanitize regex"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Resolve every placeholder in `input`. Unresolvable keys become the
/// empty string.
pub fn resolve(input: &str, collector: &Collector, index: Option<usize>) -> String {
    substitute(input, collector, index, false)
}

/// Resolve placeholders destined for a filesystem path: substituted values
/// are stripped to filename-safe characters, the literal text is kept
/// as-is.
pub fn resolve_path(input: &str, collector: &Collector, index: Option<usize>) -> String {
    substitute(input, collector, index, true)
}

fn substitute(input: &str, collector: &Collector, index: Option<usize>, sanitize: bool) -> String {
    PLACEHOLDER_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let token = caps[1].trim();
            let resolved = resolve_token(token, collector, index);
            if sanitize {
                sanitize_component(&resolved)
            } else {
                resolved
            }
        })
        .into_owned()
}

fn resolve_token(token: &str, collector: &Collector, index: Option<usize>) -> String {
    if token == "i" {
        if let Some(i) = index {
            return i.to_string();
        }
    }
    if token == "i_plus1" {
        if let Some(i) = index {
            return (i + 1).to_string();
        }
    }
    match collector.get(token) {
        Some(value) => value_to_string(value),
        None => String::new(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn sanitize_component(value: &str) -> String {
    let stripped = UNSAFE_PATH_RE.replace_all(value.trim(), "");
    WHITESPACE_RE.replace_all(&stripped, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collector_with(pairs: &[(&str, Value)]) -> Collector {
        let mut collector = Collector::new();
        for (key, value) in pairs {
            collector.insert(*key, value.clone());
        }
        collector
    }

    #[test]
    fn test_present_keys_leave_no_markers() {
        let collector = collector_with(&[("title", json!("Rust Book")), ("page", json!(3))]);
        let out = resolve("{{title}} - p{{page}}", &collector, None);
        assert_eq!(out, "Rust Book - p3");
        assert!(!out.contains("{{"));
    }

    #[test]
    fn test_absent_key_becomes_empty() {
        let collector = Collector::new();
        assert_eq!(resolve("x{{missing}}y", &collector, None), "xy");
    }

    #[test]
    fn test_index_tokens() {
        let collector = Collector::new();
        assert_eq!(resolve("row {{i}} / {{i_plus1}}", &collector, Some(4)), "row 4 / 5");
        assert_eq!(resolve("{{ i }} and {{ i_plus1 }}", &collector, Some(0)), "0 and 1");
    }

    #[test]
    fn test_index_token_without_loop_falls_back_to_collector() {
        let collector = collector_with(&[("i", json!("from-collector"))]);
        assert_eq!(resolve("{{i}}", &collector, None), "from-collector");
        assert_eq!(resolve("{{i_plus1}}", &collector, None), "");
    }

    #[test]
    fn test_idempotent_without_markers() {
        let collector = Collector::new();
        let input = "no markers here {not one} }}{{";
        assert_eq!(resolve(input, &collector, None), input);
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        let collector = collector_with(&[("outer", json!("{{inner}}")), ("inner", json!("boom"))]);
        assert_eq!(resolve("{{outer}}", &collector, None), "{{inner}}");
    }

    #[test]
    fn test_path_resolution_sanitizes_values_only() {
        let collector = collector_with(&[("title", json!("A/B: C?"))]);
        let out = resolve_path("out/{{title}}_{{i}}.pdf", &collector, Some(1));
        assert_eq!(out, "out/AB_C_1.pdf");
    }
}
