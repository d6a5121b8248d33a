use std::fmt;

use serde::Serialize;

use crate::error::CoreError;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Provider-assigned identifier correlating a submission with its result.
///
/// Opaque: the only check performed is that it is not blank. Construction
/// goes through [`TaskId::parse`], so there is no `Deserialize` impl.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Build a task id from untrusted input.
    ///
    /// The value is kept byte for byte; only an empty or all-whitespace id
    /// is rejected.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::Validation("task id must not be empty".into()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The stored association between a finished task and its audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRecord {
    pub task_id: TaskId,
    pub audio_url: String,
    pub completed_at: Timestamp,
}

impl CompletionRecord {
    pub fn new(task_id: TaskId, audio_url: String) -> Self {
        Self {
            task_id,
            audio_url,
            completed_at: chrono::Utc::now(),
        }
    }
}
