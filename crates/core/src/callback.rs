//! Classification of inbound provider callbacks.
//!
//! The provider posts every lifecycle event for a task (text generated,
//! first track ready, all tracks complete, errors) to the same callback URL.
//! Only the final `complete` event carrying a playable URL is a completion;
//! everything else is expected traffic and is ignored rather than rejected.

use std::fmt;

use serde_json::Value;

use crate::envelope::{first_string, first_verbatim};
use crate::types::TaskId;

/// Path the provider posts lifecycle events to, relative to the bridge server root.
pub const CALLBACK_PATH: &str = "/api/v1/music/callback";

/// `callbackType` value marking the final completion event.
pub const CALLBACK_TYPE_COMPLETE: &str = "complete";

const CALLBACK_TYPE_POINTERS: &[&str] = &["/callbackType", "/callback_type"];
const TASK_ID_POINTERS: &[&str] = &["/task_id", "/taskId"];
const AUDIO_URL_POINTERS: &[&str] = &["/data/0/audio_url", "/data/0/audioUrl"];

/// Result of inspecting a callback body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    /// The task finished and produced a playable URL.
    Completed { task_id: TaskId, audio_url: String },
    /// Anything else; acknowledged but not recorded.
    Ignored(IgnoreReason),
}

/// Why a callback was not treated as a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    MalformedJson,
    NotComplete { callback_type: Option<String> },
    MissingTaskId,
    MissingAudioUrl,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::MalformedJson => f.write_str("body is not valid JSON"),
            IgnoreReason::NotComplete {
                callback_type: Some(kind),
            } => write!(f, "callbackType '{kind}' is not a completion"),
            IgnoreReason::NotComplete {
                callback_type: None,
            } => f.write_str("callbackType is missing"),
            IgnoreReason::MissingTaskId => f.write_str("task id is missing"),
            IgnoreReason::MissingAudioUrl => f.write_str("first result item has no audio URL"),
        }
    }
}

/// Classify a raw callback body.
pub fn classify_bytes(body: &[u8]) -> CallbackEvent {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => classify(&value),
        Err(_) => CallbackEvent::Ignored(IgnoreReason::MalformedJson),
    }
}

/// Classify a parsed callback payload.
///
/// Accepts the bare event (`{ callbackType, task_id, data: [...] }`) as
/// well as the same event wrapped in the provider's `{ code, msg, data }`
/// envelope.
pub fn classify(payload: &Value) -> CallbackEvent {
    let event = unwrap_envelope(payload);

    let callback_type = first_string(event, CALLBACK_TYPE_POINTERS);
    if callback_type.as_deref() != Some(CALLBACK_TYPE_COMPLETE) {
        return CallbackEvent::Ignored(IgnoreReason::NotComplete { callback_type });
    }

    let Some(task_id) = first_verbatim(event, TASK_ID_POINTERS).and_then(|raw| TaskId::parse(raw).ok())
    else {
        return CallbackEvent::Ignored(IgnoreReason::MissingTaskId);
    };

    let Some(audio_url) = first_string(event, AUDIO_URL_POINTERS) else {
        return CallbackEvent::Ignored(IgnoreReason::MissingAudioUrl);
    };

    CallbackEvent::Completed { task_id, audio_url }
}

fn unwrap_envelope(payload: &Value) -> &Value {
    if first_string(payload, CALLBACK_TYPE_POINTERS).is_some() {
        return payload;
    }
    match payload.get("data") {
        Some(inner @ Value::Object(_)) => inner,
        _ => payload,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn recognizes_bare_completion() {
        let payload = json!({
            "callbackType": "complete",
            "task_id": "abc123",
            "data": [{ "audio_url": "https://cdn/x.mp3", "title": "乡村小调" }],
        });

        assert_eq!(
            classify(&payload),
            CallbackEvent::Completed {
                task_id: TaskId::parse("abc123").unwrap(),
                audio_url: "https://cdn/x.mp3".into(),
            }
        );
    }

    #[test]
    fn recognizes_completion_inside_envelope() {
        let payload = json!({
            "code": 200,
            "msg": "All generated successfully.",
            "data": {
                "callbackType": "complete",
                "task_id": "abc123",
                "data": [{ "audio_url": "https://cdn/x.mp3" }, { "audio_url": "https://cdn/y.mp3" }],
            },
        });

        assert_matches!(
            classify(&payload),
            CallbackEvent::Completed { audio_url, .. } if audio_url == "https://cdn/x.mp3"
        );
    }

    #[test]
    fn progress_events_are_ignored() {
        let payload = json!({
            "callbackType": "first",
            "task_id": "abc123",
            "data": [{ "audio_url": "https://cdn/x.mp3" }],
        });

        assert_matches!(
            classify(&payload),
            CallbackEvent::Ignored(IgnoreReason::NotComplete { callback_type: Some(t) }) if t == "first"
        );
    }

    #[test]
    fn missing_audio_url_is_ignored() {
        let payload = json!({
            "callbackType": "complete",
            "task_id": "abc123",
            "data": [{ "stream_audio_url": "https://cdn/stream" }],
        });

        assert_eq!(
            classify(&payload),
            CallbackEvent::Ignored(IgnoreReason::MissingAudioUrl)
        );
    }

    #[test]
    fn empty_result_list_is_ignored() {
        let payload = json!({ "callbackType": "complete", "task_id": "abc123", "data": [] });
        assert_eq!(
            classify(&payload),
            CallbackEvent::Ignored(IgnoreReason::MissingAudioUrl)
        );
    }

    #[test]
    fn task_id_is_kept_verbatim() {
        let payload = json!({
            "callbackType": "complete",
            "task_id": "abc ",
            "data": [{ "audio_url": "https://cdn/x.mp3" }],
        });

        assert_matches!(
            classify(&payload),
            CallbackEvent::Completed { task_id, .. } if task_id.as_str() == "abc "
        );
    }

    #[test]
    fn missing_task_id_is_ignored() {
        let payload = json!({
            "callbackType": "complete",
            "data": [{ "audio_url": "https://cdn/x.mp3" }],
        });

        assert_eq!(classify(&payload), CallbackEvent::Ignored(IgnoreReason::MissingTaskId));
    }

    #[test]
    fn malformed_body_is_ignored() {
        assert_eq!(
            classify_bytes(b"{not json"),
            CallbackEvent::Ignored(IgnoreReason::MalformedJson)
        );
        assert_eq!(
            classify_bytes(b""),
            CallbackEvent::Ignored(IgnoreReason::MalformedJson)
        );
    }

    #[test]
    fn ignore_reason_display() {
        let reason = IgnoreReason::NotComplete {
            callback_type: Some("text".into()),
        };
        assert_eq!(reason.to_string(), "callbackType 'text' is not a completion");
    }
}
