use crate::models::answer::AnswerMap;
use crate::models::attempt::AttemptAnchor;
use crate::models::evaluation::{de_opt_id, minutes_to_seconds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckAttemptResponse {
    #[serde(default)]
    pub exists: bool,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub attempt_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

impl CheckAttemptResponse {
    /// Anchor for an unfinished attempt, if the backend reported one with a
    /// usable start time.
    pub fn anchor(&self, fallback_duration: Option<i64>) -> Option<AttemptAnchor> {
        if !self.exists {
            return None;
        }
        let started_at = self.started_at?;
        Some(AttemptAnchor {
            attempt_id: self.attempt_id.clone(),
            started_at,
            duration_seconds: minutes_to_seconds(self.duration_minutes).or(fallback_duration),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub attempt_id: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

impl StartAttemptResponse {
    pub fn anchor(&self, fallback_duration: Option<i64>) -> AttemptAnchor {
        AttemptAnchor {
            attempt_id: self.attempt_id.clone(),
            started_at: self.started_at,
            duration_seconds: minutes_to_seconds(self.duration_minutes).or(fallback_duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: AnswerMap,
    pub is_time_expired: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitAttemptResponse {
    pub score: f64,
    pub total_points: f64,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default, alias = "passed")]
    pub is_passed: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    AttemptsExhausted,
    Transient,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub reason: Option<FailureReason>,
}

impl ErrorResponse {
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .or(self.detail.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}
