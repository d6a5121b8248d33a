//! Tolerant field lookup over provider JSON envelopes.
//!
//! Providers disagree on field names and nesting (`taskId` vs `task_id`,
//! bare object vs `{ code, msg, data }` wrapper). Callers describe the places
//! a value may live as an ordered list of JSON pointers, most likely first,
//! and get back the first non-blank match or `None`.

use serde_json::Value;

/// Return the first non-blank string found at any of `pointers`.
pub fn first_string(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Like [`first_string`] but returns the match untrimmed. Used for
/// identifiers, which must round-trip exactly.
pub fn first_verbatim<'a>(value: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers.iter().find_map(|pointer| {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    })
}

/// Return the first value found at any of `pointers`, whatever its type.
pub fn first_value<'a>(value: &'a Value, pointers: &[&str]) -> Option<&'a Value> {
    pointers
        .iter()
        .find_map(|pointer| value.pointer(pointer).filter(|v| !v.is_null()))
}

/// Pull a human-readable message out of an error envelope.
pub fn provider_message(value: &Value) -> Option<String> {
    first_string(
        value,
        &["/msg", "/message", "/error/message", "/error", "/data/msg"],
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn first_string_respects_candidate_order() {
        let body = json!({ "taskId": "outer", "data": { "taskId": "inner" } });

        assert_eq!(
            first_string(&body, &["/data/taskId", "/taskId"]).as_deref(),
            Some("inner")
        );
        assert_eq!(
            first_string(&body, &["/taskId", "/data/taskId"]).as_deref(),
            Some("outer")
        );
    }

    #[test]
    fn first_verbatim_keeps_surrounding_whitespace() {
        let body = json!({ "task_id": "   ", "taskId": " t-1 " });
        assert_eq!(first_verbatim(&body, &["/task_id", "/taskId"]), Some(" t-1 "));
        assert_eq!(first_verbatim(&body, &["/missing"]), None);
    }

    #[test]
    fn first_string_skips_blank_and_non_string_values() {
        let body = json!({ "data": { "taskId": "  ", "task_id": 42, "id": "t-1" } });

        assert_eq!(
            first_string(&body, &["/data/taskId", "/data/task_id", "/data/id"]).as_deref(),
            Some("t-1")
        );
    }

    #[test]
    fn first_string_returns_none_when_nothing_matches() {
        let body = json!({ "data": null });
        assert!(first_string(&body, &["/data/taskId", "/taskId"]).is_none());
    }

    #[test]
    fn first_value_skips_nulls() {
        let body = json!({ "a": null, "b": [1, 2] });
        assert_eq!(first_value(&body, &["/a", "/b"]), Some(&json!([1, 2])));
    }

    #[test]
    fn provider_message_checks_common_fields() {
        assert_eq!(
            provider_message(&json!({ "code": 429, "msg": "credits exhausted" })).as_deref(),
            Some("credits exhausted")
        );
        assert_eq!(
            provider_message(&json!({ "error": { "message": "bad key" } })).as_deref(),
            Some("bad key")
        );
        assert!(provider_message(&json!({ "code": 500 })).is_none());
    }
}
