use crate::models::attempt::DeclineReason;
use crate::models::result::EvaluationResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Notifications published by a session for whatever renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    AttemptStarted {
        attempt_id: Option<String>,
        started_at: DateTime<Utc>,
        remaining_seconds: Option<i64>,
        resumed: bool,
    },
    StartFailed {
        message: String,
    },
    Tick {
        remaining_seconds: i64,
    },
    TimeExpired,
    Completed(EvaluationResult),
    SubmitDeclined {
        reason: DeclineReason,
    },
    SubmitFailed {
        message: String,
    },
    AttemptsExhausted {
        message: String,
    },
    Redirect {
        destination: String,
    },
}
