mod common;

use common::{drain, last_tick, sample_evaluation, t0, FakeBackend, TokioClock};
use evaluation_client::models::attempt::{AttemptPhase, SubmitReason};
use evaluation_client::models::event::SessionEvent;
use evaluation_client::services::session_service::{
    EvaluationSession, SessionSettings, SubmitOutcome,
};
use evaluation_client::services::timer_service::spawn_ticker;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn settings() -> SessionSettings {
    SessionSettings {
        tick_interval: Duration::from_secs(1),
        redirect_delay: Duration::from_secs(2),
        evaluations_path: "/student/evaluations".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn ticker_fires_once_per_period_until_cancelled() {
    let counter = Arc::new(AtomicUsize::new(0));
    let handle = spawn_ticker(
        Arc::downgrade(&counter),
        Duration::from_secs(1),
        |c: Arc<AtomicUsize>| {
            c.fetch_add(1, Ordering::SeqCst);
        },
    );

    sleep(Duration::from_millis(3500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    handle.cancel();
    assert!(handle.is_cancelled());
    sleep(Duration::from_secs(5)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_the_ticker() {
    let counter = Arc::new(AtomicUsize::new(0));
    let handle = spawn_ticker(
        Arc::downgrade(&counter),
        Duration::from_secs(1),
        |c: Arc<AtomicUsize>| {
            c.fetch_add(1, Ordering::SeqCst);
        },
    );

    sleep(Duration::from_millis(1500)).await;
    drop(handle);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn ticker_exits_when_its_target_is_gone() {
    let counter = Arc::new(AtomicUsize::new(0));
    let handle = spawn_ticker(
        Arc::downgrade(&counter),
        Duration::from_secs(1),
        |c: Arc<AtomicUsize>| {
            c.fetch_add(1, Ordering::SeqCst);
        },
    );
    drop(counter);

    sleep(Duration::from_secs(2)).await;
    // The task broke out on its own; the token was never cancelled.
    assert!(!handle.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn countdown_ticks_and_submits_on_its_own() {
    let clock = Arc::new(TokioClock::new(t0()));
    let backend = Arc::new(
        FakeBackend::new(sample_evaluation(Some(1)), t0()).with_existing_attempt(t0()),
    );
    let (session, mut rx) =
        EvaluationSession::load(backend.clone(), clock.clone(), settings(), "eval-1")
            .await
            .expect("session loads");
    assert!(session.timer_running());
    assert_ok_answer(&session).await;

    sleep(Duration::from_millis(3500)).await;
    let early = drain(&mut rx);
    let ticks: Vec<i64> = early
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Tick { remaining_seconds } => Some(*remaining_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![59, 58, 57]);

    sleep(Duration::from_secs(60)).await;
    let events = drain(&mut rx);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::TimeExpired))
            .count(),
        1
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Completed(r) if r.is_time_expired)));
    assert_eq!(last_tick(&events), Some(0));

    assert_eq!(backend.submits(), 1);
    assert!(backend.last_submission().expect("sent").is_time_expired);
    assert_eq!(session.phase(), AttemptPhase::Submitted(SubmitReason::Expired));
    assert!(!session.timer_running());
}

async fn assert_ok_answer(session: &EvaluationSession) {
    session
        .record_answer("q1", "no two &mut at once")
        .await
        .expect("answer accepted");
}

#[tokio::test(start_paused = true)]
async fn manual_click_while_expiry_request_is_pending_is_declined() {
    let clock = Arc::new(TokioClock::new(t0()));
    let backend = Arc::new(
        FakeBackend::new(sample_evaluation(Some(1)), t0())
            .with_existing_attempt(t0())
            .gated_submit(),
    );
    let (session, mut rx) =
        EvaluationSession::load(backend.clone(), clock.clone(), settings(), "eval-1")
            .await
            .expect("session loads");

    sleep(Duration::from_millis(60_500)).await;
    assert_eq!(backend.submits(), 1);
    assert_eq!(session.phase(), AttemptPhase::Submitting(SubmitReason::Expired));

    let manual = session.submit_manually().await;
    assert!(matches!(manual, SubmitOutcome::Declined(_)));

    // Ticking continues while the request is outstanding, without resending.
    sleep(Duration::from_secs(3)).await;
    assert_eq!(backend.submits(), 1);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, SessionEvent::Tick { remaining_seconds: 0 })));

    backend.release_submit();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(session.phase(), AttemptPhase::Submitted(SubmitReason::Expired));
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, SessionEvent::Completed(_))));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_session_ends_the_event_stream() {
    let clock = Arc::new(TokioClock::new(t0()));
    let backend = Arc::new(FakeBackend::new(sample_evaluation(Some(10)), t0()));
    let (session, mut rx) =
        EvaluationSession::load(backend.clone(), clock.clone(), settings(), "eval-1")
            .await
            .expect("session loads");
    assert_ok_answer(&session).await;
    assert!(session.timer_running());

    sleep(Duration::from_millis(1500)).await;
    drop(session);

    let mut remaining = Vec::new();
    while let Some(event) = rx.recv().await {
        remaining.push(event);
    }
    assert!(remaining.len() <= 3);
    assert_eq!(backend.submits(), 0);
}

#[tokio::test(start_paused = true)]
async fn stalled_runtime_catches_up_from_the_wall_clock() {
    let clock = Arc::new(TokioClock::new(t0()));
    let backend = Arc::new(FakeBackend::new(sample_evaluation(Some(10)), t0()));
    let (session, mut rx) =
        EvaluationSession::load(backend.clone(), clock.clone(), settings(), "eval-1")
            .await
            .expect("session loads");
    assert_ok_answer(&session).await;

    // Jump straight past the deadline; skipped ticks are not replayed.
    tokio::time::advance(Duration::from_secs(700)).await;
    sleep(Duration::from_secs(2)).await;

    let events = drain(&mut rx);
    let expired = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::TimeExpired))
        .count();
    assert_eq!(expired, 1);
    assert!(events.iter().filter(|e| matches!(e, SessionEvent::Tick { .. })).count() < 10);
    assert_eq!(backend.submits(), 1);
    assert!(session.is_time_expired());
}
