// Best-effort live check-in counter for the scanner screen.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::domain::{CheckInApi, CheckInStats, ClientError, Visibility};
use crate::use_cases::refresh::regained;
use crate::use_cases::scoped_task::ScopedTask;

/// Reads the current counters for an event.
pub async fn fetch_stats(api: &dyn CheckInApi, event_id: &str) -> Result<CheckInStats, ClientError> {
    let participants = api.list_participants(event_id).await?;
    let event = api.get_event(event_id).await?;

    Ok(CheckInStats {
        total: event
            .attendee_count
            .filter(|count| *count > 0)
            .unwrap_or(participants.total),
        checked_in: event.checked_in_count.unwrap_or(0),
    })
}

/// Periodic stats refresh that pauses while the camera is scanning.
pub struct StatsPoller {
    stats: watch::Receiver<Option<CheckInStats>>,
    nudge: Arc<Notify>,
    task: ScopedTask,
}

impl StatsPoller {
    pub fn spawn(
        api: Arc<dyn CheckInApi>,
        event_id: String,
        period: Duration,
        scanning: watch::Receiver<bool>,
        visibility: watch::Receiver<Visibility>,
    ) -> Self {
        let (stats_tx, stats) = watch::channel(None);
        let nudge = Arc::new(Notify::new());
        let task_nudge = nudge.clone();

        let task = ScopedTask::spawn("stats_poller", move |cancel| {
            run_stats_poller(
                api, event_id, period, scanning, visibility, task_nudge, stats_tx, cancel,
            )
        });

        Self { stats, nudge, task }
    }

    pub fn latest(&self) -> Option<CheckInStats> {
        *self.stats.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CheckInStats>> {
        self.stats.clone()
    }

    /// Requests an out-of-cadence refresh (e.g. right after a check-in).
    pub fn refresh_now(&self) {
        self.nudge.notify_one();
    }

    pub async fn shutdown(self) {
        self.task.shutdown().await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_stats_poller(
    api: Arc<dyn CheckInApi>,
    event_id: String,
    period: Duration,
    scanning: watch::Receiver<bool>,
    mut visibility: watch::Receiver<Visibility>,
    nudge: Arc<Notify>,
    stats_tx: watch::Sender<Option<CheckInStats>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    visibility.mark_unchanged();
    let mut watching = true;

    loop {
        let run = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => !*scanning.borrow(),
            _ = nudge.notified() => true,
            changed = visibility.changed(), if watching => match changed {
                Ok(()) => regained(&mut visibility),
                Err(_) => {
                    watching = false;
                    false
                }
            },
        };
        if !run {
            continue;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = fetch_stats(api.as_ref(), &event_id) => result,
        };
        match result {
            Ok(stats) => {
                stats_tx.send_replace(Some(stats));
            }
            Err(e) => tracing::warn!(error = %e, event_id = %event_id, "stats refresh failed"),
        }
    }
}
