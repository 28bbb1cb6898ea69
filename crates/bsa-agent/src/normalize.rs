//! Response normalization
//!
//! Models wrap JSON in fences, prepend chatter, or return a whole document in
//! a Markdown block. These helpers recover the payload; callers decide what to
//! do when parsing still fails.

use bsa_core::{BsaError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Placeholder written in place of inline base64 images
pub const IMAGE_PLACEHOLDER: &str = "[Image Data Omitted for Context Window]";

fn json_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json(.*?)```").expect("valid regex"))
}

fn markdown_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^```(?:markdown|mermaid)?\s*(.*?)\s*```$").expect("valid regex"))
}

fn inline_image() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"!\[([^\]]*)\]\(data:image/[^;]+;base64,[^)]+\)").expect("valid regex")
    })
}

/// Pull a JSON payload out of model text
///
/// Order: empty text gives `"{}"`, then a ```` ```json ```` fence body, then
/// the first balanced `{...}` span, then the text with all fences removed.
pub fn extract_json(text: &str) -> String {
    if text.trim().is_empty() {
        return "{}".to_string();
    }

    if let Some(body) = json_fence().captures(text).and_then(|c| c.get(1)) {
        return body.as_str().trim().to_string();
    }

    if let Some(span) = first_balanced_object(text) {
        return span.to_string();
    }

    text.replace("```", "").trim().to_string()
}

/// First `{...}` span by brace-depth counting
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Unwrap a document or diagram the model returned as a single fenced block
pub fn extract_markdown(text: &str) -> String {
    let trimmed = text.trim();
    match markdown_fence().captures(trimmed).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => text.to_string(),
    }
}

/// Replace inline base64 images with a short placeholder
pub fn strip_images_for_context(markdown: &str) -> String {
    inline_image()
        .replace_all(markdown, format!("![$1]({})", IMAGE_PLACEHOLDER).as_str())
        .into_owned()
}

/// Extract and deserialize a JSON payload
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let payload = extract_json(text);
    serde_json::from_str(&payload).map_err(|e| BsaError::Parse(e.to_string()))
}

/// Deserialize an object key by key, dropping only the keys that do not fit
///
/// A nested object that fails as a whole is retried one key at a time, so a
/// single mistyped leaf costs that leaf and nothing else. Returns the value
/// plus the dotted paths of every dropped key.
pub fn from_value_lenient<T: DeserializeOwned + Default>(value: Value) -> (T, Vec<String>) {
    let fits = |candidate: &Value| serde_json::from_value::<T>(candidate.clone()).is_ok();
    let mut root = Value::Object(Map::new());
    let mut dropped = Vec::new();

    match value {
        Value::Object(fields) => absorb(&mut root, &mut Vec::new(), fields, &fits, &mut dropped),
        _ => dropped.push("$".to_string()),
    }

    (serde_json::from_value(root).unwrap_or_default(), dropped)
}

fn absorb(
    root: &mut Value,
    path: &mut Vec<String>,
    fields: Map<String, Value>,
    fits: &dyn Fn(&Value) -> bool,
    dropped: &mut Vec<String>,
) {
    for (key, value) in fields {
        set_at(root, path, &key, Some(value.clone()));
        if fits(root) {
            continue;
        }

        let nested = match value {
            Value::Object(nested) => {
                set_at(root, path, &key, Some(Value::Object(Map::new())));
                fits(root).then_some(nested)
            }
            _ => None,
        };

        match nested {
            Some(nested) => {
                path.push(key);
                absorb(root, path, nested, fits, dropped);
                path.pop();
            }
            None => {
                set_at(root, path, &key, None);
                let mut full = path.clone();
                full.push(key);
                dropped.push(full.join("."));
            }
        }
    }
}

/// Insert (`Some`) or remove (`None`) `key` in the object at `path`
fn set_at(root: &mut Value, path: &[String], key: &str, value: Option<Value>) {
    let mut node = root;
    for segment in path {
        match node.get_mut(segment) {
            Some(next) => node = next,
            None => return,
        }
    }
    if let Some(object) = node.as_object_mut() {
        match value {
            Some(value) => {
                object.insert(key.to_string(), value);
            }
            None => {
                object.remove(key);
            }
        }
    }
}

/// Top-level merge where `overlay` keys replace `base` keys
pub fn merge_shallow(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, overlay @ Value::Object(_)) => overlay,
        (base, _) => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_is_empty_object() {
        assert_eq!(extract_json(""), "{}");
        assert_eq!(extract_json("  \n"), "{}");
    }

    #[test]
    fn test_json_fence_body() {
        let x = r#"{"a": {"b": 1}}"#;
        let fenced = format!("Here you go:\n```json\n{}\n```\nThanks", x);
        assert_eq!(extract_json(&fenced), x);
    }

    #[test]
    fn test_balanced_span_is_verbatim() {
        let x = r#"{"summary": "Acme {retail}", "n": [1, 2]}"#;
        let text = format!("Sure! {} Let me know if you need more.", x);
        assert_eq!(extract_json(&text), x);
        assert_eq!(extract_json(x), x);
    }

    #[test]
    fn test_unbalanced_falls_back_to_fence_strip() {
        assert_eq!(extract_json("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(extract_json("{\"open\": true"), "{\"open\": true");
    }

    #[test]
    fn test_markdown_fence_unwrapped() {
        assert_eq!(
            extract_markdown("```markdown\n# Title\n\nBody\n```"),
            "# Title\n\nBody"
        );
        assert_eq!(extract_markdown("```\n# Title\n```\n"), "# Title");
    }

    #[test]
    fn test_mermaid_fence_unwrapped() {
        assert_eq!(
            extract_markdown("```mermaid\ngraph LR; Client-->Lambda\n```"),
            "graph LR; Client-->Lambda"
        );
    }

    #[test]
    fn test_markdown_with_inner_fence_untouched() {
        let doc = "# Title\n\n```mermaid\ngraph TD;A-->B\n```\n\nMore";
        assert_eq!(extract_markdown(doc), doc);
    }

    #[test]
    fn test_strip_images() {
        let md = "Intro\n![Cover Image](data:image/png;base64,iVBORw0KGgo=)\n![Logo](https://x.test/l.png)";
        let stripped = strip_images_for_context(md);
        assert_eq!(
            stripped,
            "Intro\n![Cover Image]([Image Data Omitted for Context Window])\n![Logo](https://x.test/l.png)"
        );
    }

    #[test]
    fn test_parse_json_error_is_parse() {
        let err = parse_json::<Value>("not json at all").unwrap_err();
        assert!(matches!(err, BsaError::Parse(_)));
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Inner {
        count: u32,
        label: String,
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Outer {
        summary: String,
        tags: Vec<String>,
        inner: Inner,
    }

    #[test]
    fn test_lenient_drops_only_bad_keys() {
        let value = json!({
            "summary": "Acme is big",
            "tags": {"not": "a list"},
            "inner": {"count": "many", "label": "kept"}
        });
        let (outer, mut dropped): (Outer, _) = from_value_lenient(value);
        dropped.sort();

        assert_eq!(outer.summary, "Acme is big");
        assert!(outer.tags.is_empty());
        assert_eq!(outer.inner.label, "kept");
        assert_eq!(outer.inner.count, 0);
        assert_eq!(dropped, vec!["inner.count".to_string(), "tags".to_string()]);
    }

    #[test]
    fn test_lenient_non_object_is_default() {
        let (outer, dropped): (Outer, _) = from_value_lenient(json!(["x"]));
        assert_eq!(outer, Outer::default());
        assert_eq!(dropped, vec!["$".to_string()]);
    }

    #[test]
    fn test_merge_shallow_repair_keys_win() {
        let base = json!({"summary": "keep", "detailedAnalysis": {"swot": {}}, "sources": [1]});
        let repair = json!({"detailedAnalysis": {"challengesAndRisks": ["Legacy"]}});
        let merged = merge_shallow(base, repair);

        assert_eq!(merged["summary"], "keep");
        assert_eq!(merged["sources"], json!([1]));
        assert_eq!(
            merged["detailedAnalysis"],
            json!({"challengesAndRisks": ["Legacy"]})
        );
    }

    #[test]
    fn test_merge_shallow_non_object_overlay_ignored() {
        let base = json!({"a": 1});
        assert_eq!(merge_shallow(base.clone(), json!("oops")), base);
    }
}
