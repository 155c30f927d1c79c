use serde::{Deserialize, Serialize};

/// Outcome handed to the result view, identical for manual and automatic
/// submissions apart from `is_time_expired`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: f64,
    pub total_points: f64,
    pub percentage: f64,
    pub is_passed: bool,
    pub is_time_expired: bool,
    pub evaluation_title: String,
    pub course_name: Option<String>,
    pub passing_score: f64,
}
