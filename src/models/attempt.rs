use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clock anchor adopted from the backend when an attempt starts or resumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptAnchor {
    pub attempt_id: Option<String>,
    pub started_at: DateTime<Utc>,
    /// `None` when the evaluation has no time limit.
    pub duration_seconds: Option<i64>,
}

impl AttemptAnchor {
    pub fn is_timed(&self) -> bool {
        self.duration_seconds.is_some()
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.duration_seconds
            .map(|d| crate::utils::time::remaining_seconds(self.started_at, d, now))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    Manual,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "reason")]
pub enum AttemptPhase {
    NotStarted,
    Running,
    /// A submission has been claimed and its request is outstanding.
    Submitting(SubmitReason),
    Submitted(SubmitReason),
    Exhausted,
}

impl AttemptPhase {
    pub fn is_closed(&self) -> bool {
        matches!(self, AttemptPhase::Submitted(_) | AttemptPhase::Exhausted)
    }

    pub fn is_submitted(&self) -> bool {
        matches!(
            self,
            AttemptPhase::Submitting(_) | AttemptPhase::Submitted(_) | AttemptPhase::Exhausted
        )
    }
}

/// Permission to send exactly one submission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionClaim {
    pub reason: SubmitReason,
}

impl SubmissionClaim {
    pub fn is_time_expired(&self) -> bool {
        self.reason == SubmitReason::Expired
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    /// Another submission already holds the guard.
    AlreadySubmitted,
    /// The countdown reached zero; the expiry path owns submission.
    TimeUp,
    /// The attempt was accepted or attempts are exhausted.
    Closed,
}
