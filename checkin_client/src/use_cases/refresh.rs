// Token refresh loop: keeps a displayed check-in credential fresh.
//
// NoCredential -> Requesting -> Displaying -> (countdown / regain / poll) -> Requesting -> ...
// and Idle once the owner stops the loop or drops it.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::domain::{ClientError, Visibility};
use crate::use_cases::scoped_task::ScopedTask;

// Anything that can (re)issue the credential a viewer displays.
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    type Credential: Clone + Send + Sync + 'static;

    async fn fetch(&self) -> Result<Self::Credential, ClientError>;
}

/// Timer cadence for one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    /// Countdown start value; reaching zero forces a refresh.
    pub countdown: Duration,
    /// Granularity of the visible countdown.
    pub tick: Duration,
    /// Optional status poll that re-fetches without resetting the countdown.
    pub status_poll: Option<Duration>,
}

impl RefreshSchedule {
    pub fn countdown_ticks(&self) -> u64 {
        let tick = self.tick.as_millis().max(1);
        (self.countdown.as_millis() / tick).max(1) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    NoCredential,
    Requesting,
    Displaying,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshTrigger {
    Countdown,
    StatusPoll,
    VisibilityRegained,
}

/// Observable state of a running loop.
#[derive(Debug, Clone)]
pub struct RefreshSnapshot<T> {
    pub phase: RefreshPhase,
    // Last credential fetched successfully; kept when a refresh fails.
    pub credential: Option<T>,
    // Countdown ticks left before the next forced refresh.
    pub remaining: u64,
    pub successful_fetches: u64,
    pub last_error: Option<String>,
}

impl<T> RefreshSnapshot<T> {
    fn empty() -> Self {
        Self {
            phase: RefreshPhase::NoCredential,
            credential: None,
            remaining: 0,
            successful_fetches: 0,
            last_error: None,
        }
    }
}

/// Handle to a running refresh loop. Dropping it cancels the timers and
/// leaves subscribers looking at `Idle`, same as `stop`.
pub struct TokenRefreshLoop<T> {
    state: watch::Receiver<RefreshSnapshot<T>>,
    state_tx: Arc<watch::Sender<RefreshSnapshot<T>>>,
    task: Option<ScopedTask>,
}

impl<T> TokenRefreshLoop<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Performs the initial request and, on success, starts the timers.
    /// Only this first failure is surfaced; later failures keep the old credential.
    pub async fn start<S>(
        source: S,
        schedule: RefreshSchedule,
        visibility: watch::Receiver<Visibility>,
    ) -> Result<Self, ClientError>
    where
        S: CredentialSource<Credential = T>,
    {
        let (state_tx, state) = watch::channel(RefreshSnapshot::empty());
        let state_tx = Arc::new(state_tx);
        state_tx.send_modify(|s| s.phase = RefreshPhase::Requesting);

        let credential = source.fetch().await.inspect_err(|e| {
            tracing::warn!(error = %e, "initial credential request failed");
        })?;
        let countdown = schedule.countdown_ticks();
        state_tx.send_modify(|s| {
            s.phase = RefreshPhase::Displaying;
            s.credential = Some(credential);
            s.remaining = countdown;
            s.successful_fetches = 1;
        });

        let loop_tx = state_tx.clone();
        let task = ScopedTask::spawn("token_refresh", move |cancel| {
            run_refresh_loop(source, schedule, visibility, loop_tx, cancel)
        });

        Ok(Self {
            state,
            state_tx,
            task: Some(task),
        })
    }

    pub fn snapshot(&self) -> RefreshSnapshot<T> {
        self.state.borrow().clone()
    }

    pub fn credential(&self) -> Option<T> {
        self.state.borrow().credential.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshSnapshot<T>> {
        self.state.clone()
    }

    /// Stops the timers and waits for the loop to end in `Idle`.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.shutdown().await;
        }
    }
}

impl<T> Drop for TokenRefreshLoop<T> {
    fn drop(&mut self) {
        // An aborted task never reaches its own `Idle` write.
        drop(self.task.take());
        self.state_tx.send_if_modified(|s| {
            let changed = s.phase != RefreshPhase::Idle;
            s.phase = RefreshPhase::Idle;
            changed
        });
    }
}

async fn run_refresh_loop<S>(
    source: S,
    schedule: RefreshSchedule,
    mut visibility: watch::Receiver<Visibility>,
    state_tx: Arc<watch::Sender<RefreshSnapshot<S::Credential>>>,
    cancel: CancellationToken,
) where
    S: CredentialSource,
{
    let countdown = schedule.countdown_ticks();
    let mut remaining = countdown;
    let mut tick = interval_at(Instant::now() + schedule.tick, schedule.tick);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poll = schedule.status_poll.map(|period| {
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll
    });

    visibility.mark_unchanged();
    let mut watching = true;

    loop {
        let trigger = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    Some(RefreshTrigger::Countdown)
                } else {
                    state_tx.send_modify(|s| s.remaining = remaining);
                    None
                }
            }
            _ = next_poll(&mut poll) => Some(RefreshTrigger::StatusPoll),
            changed = visibility.changed(), if watching => match changed {
                Ok(()) => regained(&mut visibility).then_some(RefreshTrigger::VisibilityRegained),
                Err(_) => {
                    // Visibility source is gone; timers keep running.
                    watching = false;
                    None
                }
            },
        };
        let Some(trigger) = trigger else { continue };

        // The fetch is awaited inline, so at most one request is ever in flight.
        // A regain seen meanwhile stays pending on the receiver and runs next.
        state_tx.send_modify(|s| s.phase = RefreshPhase::Requesting);
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = source.fetch() => result,
        };

        if trigger != RefreshTrigger::StatusPoll {
            remaining = countdown;
            tick.reset();
        }

        state_tx.send_modify(|s| {
            s.phase = RefreshPhase::Displaying;
            s.remaining = remaining;
            match result {
                Ok(credential) => {
                    s.credential = Some(credential);
                    s.successful_fetches += 1;
                    s.last_error = None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, ?trigger, "credential refresh failed, keeping previous");
                    s.last_error = Some(e.to_string());
                }
            }
        });
    }

    state_tx.send_modify(|s| s.phase = RefreshPhase::Idle);
}

/// Consumes a visibility change and reports whether the surface came back.
///
/// Changes coalesce, so a Hidden -> Visible pair published while nobody was
/// looking shows up as a single notice carrying `Visible`. Since publishers
/// send transitions only, any notice landing on `Visible` is a regain.
pub(crate) fn regained(visibility: &mut watch::Receiver<Visibility>) -> bool {
    *visibility.borrow_and_update() == Visibility::Visible
}

async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(poll) => {
            poll.tick().await;
        }
        None => std::future::pending().await,
    }
}
