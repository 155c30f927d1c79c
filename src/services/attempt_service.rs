use crate::models::attempt::{
    AttemptAnchor, AttemptPhase, DeclineReason, SubmissionClaim, SubmitReason,
};
use chrono::{DateTime, Utc};

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub remaining_seconds: Option<i64>,
    pub claim: Option<SubmissionClaim>,
}

/// The attempt lifecycle and its guards.
///
/// Every method is synchronous: callers hold the lock only for the
/// check-and-set and release it before any backend call, which makes the
/// first caller to observe "not submitted" the only one to proceed.
#[derive(Debug, Clone)]
pub struct AttemptState {
    phase: AttemptPhase,
    anchor: Option<AttemptAnchor>,
    start_in_flight: bool,
    resume_checked: bool,
    auto_submit_armed: bool,
    time_expired: bool,
}

impl Default for AttemptState {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptState {
    pub fn new() -> Self {
        Self {
            phase: AttemptPhase::NotStarted,
            anchor: None,
            start_in_flight: false,
            resume_checked: false,
            auto_submit_armed: false,
            time_expired: false,
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn anchor(&self) -> Option<&AttemptAnchor> {
        self.anchor.as_ref()
    }

    pub fn has_started(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_submitted(&self) -> bool {
        self.phase.is_submitted()
    }

    pub fn is_closed(&self) -> bool {
        self.phase.is_closed()
    }

    pub fn is_time_expired(&self) -> bool {
        self.time_expired
    }

    pub fn start_in_flight(&self) -> bool {
        self.start_in_flight
    }

    /// Whether an unfinished attempt has already been looked up.
    pub fn resume_checked(&self) -> bool {
        self.resume_checked
    }

    pub fn mark_resume_checked(&mut self) {
        self.resume_checked = true;
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.anchor.as_ref().and_then(|a| a.remaining_seconds(now))
    }

    /// Claims the single start slot. Returns `false` when the attempt is
    /// already anchored, closed, or another start request is outstanding.
    pub fn try_begin_start(&mut self) -> bool {
        if self.start_in_flight || self.anchor.is_some() || self.phase.is_closed() {
            return false;
        }
        self.start_in_flight = true;
        true
    }

    /// Adopts the backend's anchor. Returns `true` if it was taken.
    pub fn complete_start(&mut self, anchor: AttemptAnchor) -> bool {
        self.start_in_flight = false;
        self.resume_checked = true;
        self.adopt(anchor)
    }

    pub fn fail_start(&mut self) {
        self.start_in_flight = false;
    }

    /// Takes over an attempt discovered at load time or returned by a start
    /// request. Ignored once an anchor is already in place or the attempt is
    /// closed. A submission claimed before the anchor arrived keeps its phase.
    pub fn adopt(&mut self, anchor: AttemptAnchor) -> bool {
        if self.anchor.is_some() || self.phase.is_closed() {
            return false;
        }
        self.anchor = Some(anchor);
        self.auto_submit_armed = true;
        if self.phase == AttemptPhase::NotStarted {
            self.phase = AttemptPhase::Running;
        }
        true
    }

    /// Recomputes remaining time from the wall clock and, the first time it
    /// reaches zero while running, claims the automatic submission.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let remaining_seconds = self.remaining_seconds(now);
        let mut claim = None;
        if self.phase == AttemptPhase::Running
            && self.auto_submit_armed
            && remaining_seconds == Some(0)
        {
            self.auto_submit_armed = false;
            claim = Some(self.claim(SubmitReason::Expired));
        }
        TickOutcome {
            remaining_seconds,
            claim,
        }
    }

    /// User-initiated submission. Declined while another submission holds
    /// the guard, after closure, or once the countdown has hit zero.
    pub fn claim_manual(&mut self, now: DateTime<Utc>) -> Result<SubmissionClaim, DeclineReason> {
        match self.phase {
            AttemptPhase::Submitted(_) | AttemptPhase::Exhausted => {
                return Err(DeclineReason::Closed)
            }
            AttemptPhase::Submitting(_) => return Err(DeclineReason::AlreadySubmitted),
            AttemptPhase::NotStarted | AttemptPhase::Running => {}
        }
        if self.remaining_seconds(now) == Some(0) {
            return Err(DeclineReason::TimeUp);
        }
        Ok(self.claim(SubmitReason::Manual))
    }

    fn claim(&mut self, reason: SubmitReason) -> SubmissionClaim {
        self.phase = AttemptPhase::Submitting(reason);
        self.time_expired = reason == SubmitReason::Expired;
        SubmissionClaim { reason }
    }

    pub fn settle_accepted(&mut self) {
        if let AttemptPhase::Submitting(reason) = self.phase {
            self.phase = AttemptPhase::Submitted(reason);
        }
    }

    pub fn settle_exhausted(&mut self) {
        self.phase = AttemptPhase::Exhausted;
        self.auto_submit_armed = false;
    }

    /// Releases the guard after a recoverable failure. An expired submission
    /// re-arms the trigger so the next tick tries again.
    pub fn settle_failed(&mut self) {
        let AttemptPhase::Submitting(reason) = self.phase else {
            return;
        };
        self.phase = if self.anchor.is_some() {
            AttemptPhase::Running
        } else {
            AttemptPhase::NotStarted
        };
        self.time_expired = false;
        if reason == SubmitReason::Expired {
            self.auto_submit_armed = true;
        }
    }
}
