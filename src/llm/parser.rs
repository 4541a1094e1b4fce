use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:json)?").expect("invalid code fence regex"));

static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("invalid object span regex"));

static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("invalid trailing comma regex"));

/// Pulls a JSON value out of a model reply that may wrap it in Markdown code
/// fences, surround it with prose, or leave trailing commas behind. Returns
/// `None` when no parse attempt succeeds, which callers treat as a fallback
/// signal rather than an error.
pub fn extract_json(raw_text: &str) -> Option<Value> {
    if raw_text.trim().is_empty() {
        return None;
    }

    let cleaned = CODE_FENCE_RE.replace_all(raw_text, "");
    let cleaned = cleaned.trim();

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    let candidate = JSON_OBJECT_RE.find(cleaned)?.as_str();
    let candidate = candidate.trim_matches(|c: char| c == '`' || c.is_whitespace());

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some(value);
    }

    let repaired = TRAILING_COMMA_RE.replace_all(candidate, "$1");
    serde_json::from_str::<Value>(&repaired).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_fenced_json_blocks() {
        assert_eq!(
            extract_json("```json\n{\"a\":1}\n```"),
            Some(json!({"a": 1}))
        );
    }

    #[test]
    fn parses_bare_fences_case_insensitively() {
        assert_eq!(
            extract_json("```JSON\n{\"mode\": \"tiered\"}\n```"),
            Some(json!({"mode": "tiered"}))
        );
    }

    #[test]
    fn returns_none_without_json() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json(""), None);
        assert_eq!(extract_json("   \n  "), None);
    }

    #[test]
    fn tolerates_trailing_commas() {
        assert_eq!(extract_json("{\"a\":1,}"), Some(json!({"a": 1})));
        assert_eq!(
            extract_json("{\"items\": [1, 2, 3,],}"),
            Some(json!({"items": [1, 2, 3]}))
        );
    }

    #[test]
    fn finds_an_object_embedded_in_prose() {
        let reply = "好的，以下是分析結果：\n{\"estimated_dimensions\": {\"area_ping\": \"8\"}}\n希望對您有幫助。";
        let value = extract_json(reply).unwrap();
        assert_eq!(
            value["estimated_dimensions"]["area_ping"],
            json!("8")
        );
    }

    #[test]
    fn broken_braces_yield_none() {
        assert_eq!(extract_json("{\"a\": "), None);
    }
}
