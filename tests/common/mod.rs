#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use evaluation_client::dto::backend_dto::{
    CheckAttemptResponse, StartAttemptResponse, SubmitAttemptRequest, SubmitAttemptResponse,
};
use evaluation_client::error::{Error, Result};
use evaluation_client::models::evaluation::{Evaluation, Question, QuestionType};
use evaluation_client::models::event::SessionEvent;
use evaluation_client::services::backend_service::{classify_failure, EvaluationBackend};
use evaluation_client::utils::time::{from_rfc3339, Clock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Semaphore;

pub fn t0() -> DateTime<Utc> {
    from_rfc3339("2026-03-02T09:00:00Z").expect("valid timestamp")
}

pub fn sample_evaluation(duration_minutes: Option<u32>) -> Evaluation {
    Evaluation {
        id: "eval-1".to_string(),
        title: "Rust ownership quiz".to_string(),
        description: None,
        course_name: Some("Systems Programming".to_string()),
        duration_minutes,
        questions: vec![
            Question {
                id: "q1".to_string(),
                question_type: QuestionType::ShortAnswer,
                text: "What does the borrow checker verify?".to_string(),
                options: vec![],
                points: 2,
            },
            Question {
                id: "q2".to_string(),
                question_type: QuestionType::MultipleChoice,
                text: "Which type is Copy?".to_string(),
                options: vec!["String".to_string(), "u32".to_string(), "Vec<u8>".to_string()],
                points: 1,
            },
            Question {
                id: "q3".to_string(),
                question_type: QuestionType::TrueFalse,
                text: "A &mut T may alias another &T.".to_string(),
                options: vec![],
                points: 1,
            },
        ],
        passing_score: 50.0,
        max_attempts: Some(1),
    }
}

/// Wall clock the test moves by hand.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += ChronoDuration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Wall clock that follows tokio's (pausable) clock, so `start_paused`
/// tests move both the ticker and the countdown together.
pub struct TokioClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.origin;
        self.base + ChronoDuration::from_std(elapsed).expect("elapsed fits")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitScript {
    Accept,
    Transient,
    Exhausted,
}

/// In-memory backend that counts calls and can hold requests open.
pub struct FakeBackend {
    pub evaluation: Evaluation,
    pub existing: Mutex<Option<CheckAttemptResponse>>,
    pub started_at: DateTime<Utc>,
    pub fail_start: AtomicBool,
    pub fail_check: AtomicBool,
    pub start_gate: Option<Semaphore>,
    pub submit_gate: Option<Semaphore>,
    pub submit_script: Mutex<VecDeque<SubmitScript>>,
    pub submissions: Mutex<Vec<SubmitAttemptRequest>>,
    pub get_calls: AtomicUsize,
    pub check_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(evaluation: Evaluation, started_at: DateTime<Utc>) -> Self {
        Self {
            evaluation,
            existing: Mutex::new(None),
            started_at,
            fail_start: AtomicBool::new(false),
            fail_check: AtomicBool::new(false),
            start_gate: None,
            submit_gate: None,
            submit_script: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            get_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_existing_attempt(self, started_at: DateTime<Utc>) -> Self {
        *self.existing.lock().unwrap() = Some(CheckAttemptResponse {
            exists: true,
            attempt_id: Some("attempt-existing".to_string()),
            started_at: Some(started_at),
            duration_minutes: self.evaluation.duration_minutes,
        });
        self
    }

    pub fn gated_start(mut self) -> Self {
        self.start_gate = Some(Semaphore::new(0));
        self
    }

    pub fn gated_submit(mut self) -> Self {
        self.submit_gate = Some(Semaphore::new(0));
        self
    }

    pub fn script(self, steps: &[SubmitScript]) -> Self {
        self.submit_script.lock().unwrap().extend(steps.iter().copied());
        self
    }

    pub fn release_start(&self) {
        if let Some(gate) = &self.start_gate {
            gate.add_permits(1);
        }
    }

    pub fn release_submit(&self) {
        if let Some(gate) = &self.submit_gate {
            gate.add_permits(1);
        }
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn checks(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn last_submission(&self) -> Option<SubmitAttemptRequest> {
        self.submissions.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EvaluationBackend for FakeBackend {
    async fn get_evaluation(&self, evaluation_id: &str) -> Result<Evaluation> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if evaluation_id != self.evaluation.id {
            return Err(Error::NotFound(format!("Evaluation {} not found", evaluation_id)));
        }
        Ok(self.evaluation.clone())
    }

    async fn check_attempt(&self, _evaluation_id: &str) -> Result<CheckAttemptResponse> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_check.load(Ordering::SeqCst) {
            return Err(Error::Backend {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(self.existing.lock().unwrap().clone().unwrap_or_default())
    }

    async fn start_attempt(&self, _evaluation_id: &str) -> Result<StartAttemptResponse> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.start_gate {
            gate.acquire().await.expect("gate open").forget();
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::Backend {
                status: 500,
                message: "Could not start attempt".to_string(),
            });
        }
        Ok(StartAttemptResponse {
            attempt_id: Some("attempt-new".to_string()),
            started_at: self.started_at,
            duration_minutes: self.evaluation.duration_minutes,
        })
    }

    async fn submit_attempt(
        &self,
        _evaluation_id: &str,
        submission: &SubmitAttemptRequest,
    ) -> Result<SubmitAttemptResponse> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().push(submission.clone());
        if let Some(gate) = &self.submit_gate {
            gate.acquire().await.expect("gate open").forget();
        }
        let step = self
            .submit_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SubmitScript::Accept);
        match step {
            SubmitScript::Accept => Ok(SubmitAttemptResponse {
                score: 3.0,
                total_points: 4.0,
                percentage: None,
                is_passed: None,
            }),
            SubmitScript::Transient => Err(classify_failure(
                502,
                r#"{"error":"Bad gateway"}"#,
            )),
            SubmitScript::Exhausted => Err(classify_failure(
                400,
                r#"{"error":"Nombre maximum de tentatives atteint pour cette évaluation"}"#,
            )),
        }
    }
}

pub fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn last_tick(events: &[SessionEvent]) -> Option<i64> {
    events.iter().rev().find_map(|e| match e {
        SessionEvent::Tick { remaining_seconds } => Some(*remaining_seconds),
        _ => None,
    })
}
