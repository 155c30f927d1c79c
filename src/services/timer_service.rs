use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Owns a running ticker. Dropping the handle stops it.
pub struct TimerHandle {
    token: CancellationToken,
    _guard: DropGuard,
}

impl TimerHandle {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Calls `on_tick` every `period` for as long as `target` is alive and the
/// returned handle has not been dropped or cancelled. The first call happens
/// one period after spawning. Ticks missed while the runtime was busy are
/// skipped rather than replayed in a burst.
pub fn spawn_ticker<T, F>(target: Weak<T>, period: Duration, on_tick: F) -> TimerHandle
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) + Send + 'static,
{
    let token = CancellationToken::new();
    let child = token.clone();

    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = child.cancelled() => break,
                _ = interval.tick() => {
                    let Some(target) = target.upgrade() else { break };
                    on_tick(target);
                }
            }
        }
        tracing::debug!("attempt ticker stopped");
    });

    TimerHandle {
        _guard: token.clone().drop_guard(),
        token,
    }
}
