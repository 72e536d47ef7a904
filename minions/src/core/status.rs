//! Terminal statuses of task nodes and how they propagate.

use std::fmt;

use serde::Serialize;

/// Why a node failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    MissingArgument,
    InvalidArgument,
    UnspecifiedError,
    DidNotAchieveGoal,
    UserDidNotRespond,
    ExceededTokenLimit,
    InsufficientAiResponse,
    InvalidWorkspace,
    NoParseablePlan,
    BadApiKey,
    RateLimited,
    OtherApiError,
}

impl Failure {
    pub fn describe(self) -> &'static str {
        match self {
            Failure::MissingArgument => "missing argument",
            Failure::InvalidArgument => "invalid argument",
            Failure::UnspecifiedError => "unspecified error",
            Failure::DidNotAchieveGoal => "did not achieve goal",
            Failure::UserDidNotRespond => "user did not respond",
            Failure::ExceededTokenLimit => "exceeded token limit",
            Failure::InsufficientAiResponse => "insufficient AI response",
            Failure::InvalidWorkspace => "invalid workspace",
            Failure::NoParseablePlan => "no parseable plan",
            Failure::BadApiKey => "bad API key",
            Failure::RateLimited => "rate limited",
            Failure::OtherApiError => "model API error",
        }
    }
}

/// Lifecycle state of a node. Anything but `NotStarted` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    Finished,
    UserCancelled,
    Failed(Failure),
}

impl Status {
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed(_) | Status::UserCancelled)
    }

    /// Failures that abort every ancestor instead of triggering a replan.
    pub fn is_fatal_failure(self) -> bool {
        matches!(
            self,
            Status::UserCancelled
                | Status::Failed(
                    Failure::BadApiKey | Failure::RateLimited | Failure::InvalidWorkspace
                )
        )
    }

    pub fn is_terminal(self) -> bool {
        self != Status::NotStarted
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotStarted => f.write_str("Not started"),
            Status::Finished => f.write_str("Finished"),
            Status::UserCancelled => f.write_str("Cancelled by user"),
            Status::Failed(failure) => write!(f, "Failed ({})", failure.describe()),
        }
    }
}

/// A terminal status plus an optional human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusReport {
    pub fn finished(message: impl Into<String>) -> Self {
        Self {
            status: Status::Finished,
            message: Some(message.into()),
        }
    }

    pub fn failed(failure: Failure, message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed(failure),
            message: Some(message.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: Status::UserCancelled,
            message: None,
        }
    }
}

impl From<Failure> for StatusReport {
    fn from(failure: Failure) -> Self {
        Self {
            status: Status::Failed(failure),
            message: None,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}
