use crate::config::Config;
use crate::dto::backend_dto::SubmitAttemptRequest;
use crate::error::{Error, Result};
use crate::models::answer::{AnswerMap, AnswerSet};
use crate::models::attempt::{AttemptAnchor, AttemptPhase, DeclineReason, SubmissionClaim};
use crate::models::evaluation::Evaluation;
use crate::models::event::SessionEvent;
use crate::models::result::EvaluationResult;
use crate::services::attempt_service::AttemptState;
use crate::services::backend_service::EvaluationBackend;
use crate::services::result_service::ResultService;
use crate::services::timer_service::{spawn_ticker, TimerHandle};
use crate::utils::time::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tick_interval: Duration,
    pub redirect_delay: Duration,
    /// Where the user is sent once attempts are exhausted.
    pub evaluations_path: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            redirect_delay: Duration::from_secs(2),
            evaluations_path: "/evaluations".to_string(),
        }
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            redirect_delay: config.redirect_delay(),
            evaluations_path: config.evaluations_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed(EvaluationResult),
    Declined(DeclineReason),
    /// Recoverable; the guard has been released.
    Failed(String),
    AttemptsExhausted(String),
}

/// One user taking one evaluation. Owns the attempt timer; dropping the
/// session stops it.
pub struct EvaluationSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    evaluation: Evaluation,
    backend: Arc<dyn EvaluationBackend>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    state: Mutex<AttemptState>,
    answers: Mutex<AnswerSet>,
    events: UnboundedSender<SessionEvent>,
    timer: Mutex<Option<TimerHandle>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EvaluationSession {
    /// Loads the evaluation and adopts an unfinished attempt if the backend
    /// reports one. A load failure is returned as is and no timer exists.
    pub async fn load(
        backend: Arc<dyn EvaluationBackend>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
        evaluation_id: &str,
    ) -> Result<(Self, UnboundedReceiver<SessionEvent>)> {
        let evaluation = backend.get_evaluation(evaluation_id).await?;
        info!(
            evaluation_id = %evaluation.id,
            questions = evaluation.questions.len(),
            "evaluation loaded"
        );

        let (events, rx) = unbounded_channel();
        let inner = Arc::new(SessionInner {
            answers: Mutex::new(AnswerSet::seed(&evaluation.questions)),
            evaluation,
            backend,
            clock,
            settings,
            state: Mutex::new(AttemptState::new()),
            events,
            timer: Mutex::new(None),
        });

        inner.resume_existing().await;
        Ok((Self { inner }, rx))
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.inner.evaluation
    }

    pub fn phase(&self) -> AttemptPhase {
        lock(&self.inner.state).phase()
    }

    pub fn has_started(&self) -> bool {
        lock(&self.inner.state).has_started()
    }

    pub fn is_submitted(&self) -> bool {
        lock(&self.inner.state).is_submitted()
    }

    pub fn is_time_expired(&self) -> bool {
        lock(&self.inner.state).is_time_expired()
    }

    pub fn anchor(&self) -> Option<AttemptAnchor> {
        lock(&self.inner.state).anchor().cloned()
    }

    pub fn remaining_seconds(&self) -> Option<i64> {
        let now = self.inner.clock.now();
        lock(&self.inner.state).remaining_seconds(now)
    }

    pub fn answer(&self, question_id: &str) -> Option<String> {
        lock(&self.inner.answers).get(question_id).map(str::to_string)
    }

    pub fn answers(&self) -> AnswerMap {
        lock(&self.inner.answers).snapshot()
    }

    pub fn timer_running(&self) -> bool {
        lock(&self.inner.timer)
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    /// Stores an answer locally and, on the first edit, starts the attempt.
    /// A failed start leaves the answer in place.
    pub async fn record_answer(&self, question_id: &str, value: impl Into<String>) -> Result<()> {
        let closed = lock(&self.inner.state).is_closed();
        if closed {
            return Err(Error::AttemptClosed);
        }
        lock(&self.inner.answers).set(question_id, value)?;

        let started = lock(&self.inner.state).has_started();
        if !started {
            self.inner.start_or_resume_attempt().await;
        }
        Ok(())
    }

    pub async fn start_or_resume_attempt(&self) {
        self.inner.start_or_resume_attempt().await;
    }

    pub async fn submit_manually(&self) -> SubmitOutcome {
        let now = self.inner.clock.now();
        let claim = lock(&self.inner.state).claim_manual(now);
        match claim {
            Ok(claim) => self.inner.run_submission(claim).await,
            Err(reason) => {
                debug!(?reason, "manual submission declined");
                self.inner.emit(SessionEvent::SubmitDeclined { reason });
                SubmitOutcome::Declined(reason)
            }
        }
    }

    /// One timer step. Returns the submission outcome when this tick fired
    /// the automatic submission.
    pub async fn on_tick(&self) -> Option<SubmitOutcome> {
        let claim = self.inner.tick_once()?;
        Some(self.inner.run_submission(claim).await)
    }

    /// Stops the ticker. Also happens on drop.
    pub fn close(&self) {
        self.inner.stop_timer();
    }
}

impl Drop for EvaluationSession {
    fn drop(&mut self) {
        self.inner.stop_timer();
    }
}

impl SessionInner {
    fn emit(&self, event: SessionEvent) {
        // The receiver going away must not disturb the attempt.
        let _ = self.events.send(event);
    }

    async fn resume_existing(self: &Arc<Self>) {
        let evaluation_id = self.evaluation.id.as_str();
        match self.backend.check_attempt(evaluation_id).await {
            Ok(existing) => {
                lock(&self.state).mark_resume_checked();
                if let Some(anchor) = existing.anchor(self.evaluation.duration_seconds()) {
                    info!(evaluation_id, started_at = %anchor.started_at, "resuming unfinished attempt");
                    self.adopt(anchor, true);
                }
            }
            Err(e) => {
                warn!(evaluation_id, error = %e, "could not look up an existing attempt");
            }
        }
    }

    async fn start_or_resume_attempt(self: &Arc<Self>) {
        let needs_check = {
            let mut state = lock(&self.state);
            if !state.try_begin_start() {
                return;
            }
            !state.resume_checked()
        };
        let evaluation_id = self.evaluation.id.as_str();
        let fallback_duration = self.evaluation.duration_seconds();

        if needs_check {
            match self.backend.check_attempt(evaluation_id).await {
                Ok(existing) => {
                    lock(&self.state).mark_resume_checked();
                    if let Some(anchor) = existing.anchor(fallback_duration) {
                        lock(&self.state).fail_start();
                        self.adopt(anchor, true);
                        return;
                    }
                }
                Err(e) => {
                    lock(&self.state).fail_start();
                    warn!(evaluation_id, error = %e, "attempt lookup failed");
                    self.emit(SessionEvent::StartFailed {
                        message: e.user_message(),
                    });
                    return;
                }
            }
        }

        match self.backend.start_attempt(evaluation_id).await {
            Ok(started) => {
                let anchor = started.anchor(fallback_duration);
                info!(evaluation_id, attempt_id = ?anchor.attempt_id, "attempt started");
                let adopted = lock(&self.state).complete_start(anchor.clone());
                if adopted {
                    self.after_adopt(&anchor, false);
                }
            }
            Err(e) => {
                lock(&self.state).fail_start();
                warn!(evaluation_id, error = %e, "attempt start failed");
                self.emit(SessionEvent::StartFailed {
                    message: e.user_message(),
                });
            }
        }
    }

    fn adopt(self: &Arc<Self>, anchor: AttemptAnchor, resumed: bool) {
        let adopted = lock(&self.state).adopt(anchor.clone());
        if adopted {
            self.after_adopt(&anchor, resumed);
        }
    }

    fn after_adopt(self: &Arc<Self>, anchor: &AttemptAnchor, resumed: bool) {
        self.emit(SessionEvent::AttemptStarted {
            attempt_id: anchor.attempt_id.clone(),
            started_at: anchor.started_at,
            remaining_seconds: anchor.remaining_seconds(self.clock.now()),
            resumed,
        });
        if anchor.is_timed() {
            self.start_timer();
        }
    }

    fn start_timer(self: &Arc<Self>) {
        let mut timer = lock(&self.timer);
        if timer.is_some() {
            return;
        }
        *timer = Some(spawn_ticker(
            Arc::downgrade(self),
            self.settings.tick_interval,
            |inner: Arc<SessionInner>| {
                if let Some(claim) = inner.tick_once() {
                    // Submission runs on its own so ticking carries on while
                    // the request is outstanding.
                    tokio::spawn(async move {
                        inner.run_submission(claim).await;
                    });
                }
            },
        ));
    }

    fn stop_timer(&self) {
        if let Some(timer) = lock(&self.timer).as_ref() {
            timer.cancel();
        }
    }

    fn tick_once(&self) -> Option<SubmissionClaim> {
        let now = self.clock.now();
        let outcome = {
            let mut state = lock(&self.state);
            if state.is_closed() {
                return None;
            }
            state.tick(now)
        };
        if let Some(remaining_seconds) = outcome.remaining_seconds {
            self.emit(SessionEvent::Tick { remaining_seconds });
        }
        if outcome.claim.is_some() {
            info!(evaluation_id = %self.evaluation.id, "time is up, submitting automatically");
            self.emit(SessionEvent::TimeExpired);
        }
        outcome.claim
    }

    async fn run_submission(&self, claim: SubmissionClaim) -> SubmitOutcome {
        let evaluation_id = self.evaluation.id.as_str();
        // Read at send time, not when the claim was taken.
        let request = SubmitAttemptRequest {
            answers: lock(&self.answers).snapshot(),
            is_time_expired: claim.is_time_expired(),
        };
        info!(
            evaluation_id,
            reason = ?claim.reason,
            answers = request.answers.len(),
            "submitting attempt"
        );

        match self.backend.submit_attempt(evaluation_id, &request).await {
            Ok(response) => {
                lock(&self.state).settle_accepted();
                self.stop_timer();
                let result =
                    ResultService::shape(&self.evaluation, &response, claim.is_time_expired());
                info!(
                    evaluation_id,
                    score = result.score,
                    percentage = result.percentage,
                    passed = result.is_passed,
                    "attempt submitted"
                );
                self.emit(SessionEvent::Completed(result.clone()));
                SubmitOutcome::Completed(result)
            }
            Err(e) if e.is_attempts_exhausted() => {
                lock(&self.state).settle_exhausted();
                self.stop_timer();
                let message = e.user_message();
                warn!(evaluation_id, %message, "no attempts left");
                self.emit(SessionEvent::AttemptsExhausted {
                    message: message.clone(),
                });
                self.schedule_redirect();
                SubmitOutcome::AttemptsExhausted(message)
            }
            Err(e) => {
                lock(&self.state).settle_failed();
                warn!(evaluation_id, error = %e, "submission failed, guard released");
                let message = e.user_message();
                self.emit(SessionEvent::SubmitFailed {
                    message: message.clone(),
                });
                SubmitOutcome::Failed(message)
            }
        }
    }

    fn schedule_redirect(&self) {
        let events = self.events.clone();
        let delay = self.settings.redirect_delay;
        let destination = self.settings.evaluations_path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::Redirect { destination });
        });
    }
}
