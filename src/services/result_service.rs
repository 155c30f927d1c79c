use crate::dto::backend_dto::SubmitAttemptResponse;
use crate::models::evaluation::Evaluation;
use crate::models::result::EvaluationResult;

pub struct ResultService;

impl ResultService {
    /// Normalizes a submission response. Backends that leave out the
    /// percentage or the pass flag get them derived from the score and the
    /// evaluation's passing threshold.
    pub fn shape(
        evaluation: &Evaluation,
        response: &SubmitAttemptResponse,
        is_time_expired: bool,
    ) -> EvaluationResult {
        let percentage = response
            .percentage
            .unwrap_or_else(|| percentage_of(response.score, response.total_points));
        let is_passed = response
            .is_passed
            .unwrap_or(percentage >= evaluation.passing_score);

        EvaluationResult {
            score: response.score,
            total_points: response.total_points,
            percentage,
            is_passed,
            is_time_expired,
            evaluation_title: evaluation.title.clone(),
            course_name: evaluation.course_name.clone(),
            passing_score: evaluation.passing_score,
        }
    }
}

fn percentage_of(score: f64, total: f64) -> f64 {
    if total > 0.0 {
        (score / total) * 100.0
    } else {
        0.0
    }
}
