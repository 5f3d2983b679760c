//! Lenient parsing of the model's JSON answers.
//!
//! The model is asked for a bare JSON array, but answers arrive wrapped in code fences,
//! cut off mid-object when the output limit is hit, or with trailing chatter. A strict
//! parse is tried first; when it fails, every balanced top-level object is salvaged.

use serde_json::{Map, Value};

use crate::html::truncate_chars;

/// Characters of an unusable response kept in the log.
const PREVIEW_CHARS: usize = 300;

pub type JsonObject = Map<String, Value>;

/// Removes a surrounding Markdown code fence (with an optional `json` tag).
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").or_else(|| rest.strip_prefix("JSON")).unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // An unterminated fence means the answer was cut off: keep everything after the tag.
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

/// Every complete outermost `{...}` object in `text`, in order, whether or not an enclosing
/// array is present. Brackets inside string literals, escaped quotes included, are ignored.
/// Objects that aren't valid JSON or have no `title` key are skipped.
pub fn repair_objects(text: &str) -> Vec<JsonObject> {
    let bytes = text.as_bytes();

    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut object_start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    object_start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(begin) = object_start.take()
                    && let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&text[begin..=i])
                    && object.contains_key("title")
                {
                    objects.push(object);
                }
            }
            _ => {}
        }
    }
    objects
}

/// The job objects in a model response: a strict parse first, then [`repair_objects`].
/// An empty vector means the model found nothing or the response was unusable.
pub fn parse_job_objects(response: &str) -> Vec<JsonObject> {
    let body = strip_code_fence(response);

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => {
            return items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(object) => Some(object),
                    _ => None,
                })
                .collect();
        }
        Ok(Value::Object(object)) => return vec![object],
        Ok(other) => {
            tracing::warn!("Model answered with JSON that isn't an array: {}", preview(&other.to_string()));
            return Vec::new();
        }
        Err(e) => tracing::debug!("Response is not valid JSON ({}), salvaging complete objects", e),
    }

    let objects = repair_objects(body);
    if objects.is_empty() {
        tracing::warn!("Could not extract any job from the response. Preview: {}", preview(response));
    } else {
        tracing::info!("Recovered {} jobs from a partial response", objects.len());
    }
    objects
}

/// The string value of `key`, trimmed. Missing, non-string and blank values are `None`.
pub fn string_field<'a>(object: &'a JsonObject, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn preview(text: &str) -> String {
    let head = truncate_chars(text, PREVIEW_CHARS);
    if head.len() < text.len() { format!("{}...", head) } else { head.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(objects: &[JsonObject]) -> Vec<&str> {
        objects.iter().filter_map(|o| string_field(o, "title")).collect()
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("```json\n[{\"title\": \"A\"}, {\"ti"), "[{\"title\": \"A\"}, {\"ti");
        assert_eq!(strip_code_fence("```json\n[]\n```\nHope this helps!"), "[]");
    }

    #[test]
    fn test_parse_fenced_array() {
        let response = "```json\n[{\"title\": \"Backend Engineer\"}, {\"title\": \"SRE\"}]\n```";
        assert_eq!(titles(&parse_job_objects(response)), vec!["Backend Engineer", "SRE"]);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_job_objects("[]").is_empty());
    }

    #[test]
    fn test_repair_truncated_array_keeps_complete_objects() {
        let response = r#"[
            {"title": "Backend Engineer", "company": "A", "url": "/jobs/1"},
            {"title": "Frontend Engineer", "company": "A", "url": "/jobs/2"},
            {"title": "Data Engineer", "company": "A", "url": "/jobs/3"},
            {"title": "Site Reliability Eng"#;

        let objects = parse_job_objects(response);
        assert_eq!(objects.len(), 3);
        assert!(objects.iter().all(|o| string_field(o, "title").is_some()));
    }

    #[test]
    fn test_repair_ignores_braces_and_escaped_quotes_in_strings() {
        let response = r#"[{"title": "Engineer {Platform}", "description": "Say \"hi}\" to us"},
            {"title": "Designer", "meta": {"nested": true}}, {"title": "cut"#;
        let objects = repair_objects(response);
        assert_eq!(titles(&objects), vec!["Engineer {Platform}", "Designer"]);
    }

    #[test]
    fn test_repair_without_enclosing_array_and_brackets_in_titles() {
        let response = r#"{"title": "Eng [L3]", "url": "/jobs/3"}, {"title": "Eng [L4]", "url": "/jobs/4"}, {"title": "Eng"#;
        let objects = parse_job_objects(response);
        assert_eq!(titles(&objects), vec!["Eng [L3]", "Eng [L4]"]);

        let response = r#"Here you go: [{"title": "SRE [remote]"}, {"title": "PM"}, {"ti"#;
        assert_eq!(titles(&repair_objects(response)), vec!["SRE [remote]", "PM"]);
    }

    #[test]
    fn test_repair_skips_objects_without_title_and_invalid_objects() {
        let response = r#"[{"name": "no title"}, {"title": "Valid"}, {"title": "Broken",,}, {"#;
        assert_eq!(titles(&repair_objects(response)), vec!["Valid"]);
    }

    #[test]
    fn test_repair_handles_multibyte_text() {
        let response = r#"[{"title": "Ingénieur logiciel", "location": "Zürich"}, {"title": "日本"#;
        assert_eq!(titles(&repair_objects(response)), vec!["Ingénieur logiciel"]);
    }

    #[test]
    fn test_total_failure_is_empty() {
        assert!(parse_job_objects("I could not find any jobs on this page.").is_empty());
        assert!(parse_job_objects("").is_empty());
        assert!(parse_job_objects("42").is_empty());
    }

    #[test]
    fn test_string_field_treats_blank_and_non_strings_as_missing() {
        let object: JsonObject =
            serde_json::from_str(r#"{"title": "  A  ", "company": "", "location": null, "url": 7}"#).unwrap();
        assert_eq!(string_field(&object, "title"), Some("A"));
        assert_eq!(string_field(&object, "company"), None);
        assert_eq!(string_field(&object, "location"), None);
        assert_eq!(string_field(&object, "url"), None);
        assert_eq!(string_field(&object, "description"), None);
    }
}
