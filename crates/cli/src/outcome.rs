//! Process exit codes for the command-line client.

use std::process::ExitCode;

use songbridge_provider::PollError;

/// How a command ended, as seen by the calling shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Submitted, or waited and got a URL.
    Success,
    /// Configuration, submission or status transport failure.
    Failure,
    /// The poll budget ran out.
    TimedOut,
    /// The provider reported the task as failed.
    TaskFailed,
    /// Interrupted with Ctrl-C.
    Cancelled,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure => 1,
            Outcome::TimedOut => 2,
            Outcome::TaskFailed => 3,
            Outcome::Cancelled => 130,
        }
    }
}

impl From<&PollError> for Outcome {
    fn from(err: &PollError) -> Self {
        match err {
            PollError::Timeout { .. } => Outcome::TimedOut,
            PollError::TaskFailed { .. } => Outcome::TaskFailed,
            PollError::Cancelled => Outcome::Cancelled,
            PollError::Transport { .. } | PollError::AlreadyWaiting(_) => Outcome::Failure,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.code())
    }
}
