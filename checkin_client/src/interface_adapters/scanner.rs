// Line-oriented scanner: each line from the source is one decoded payload.
// Fits keyboard-wedge barcode readers, which type the code followed by Enter.
//
// Lines are handed over one at a time: the next line is read only after the
// previous one was received. A line handed to a capture that stopped before
// receiving it is replayed by the next capture.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{CameraDevice, Scanner};
use crate::use_cases::ScopedTask;

pub const LINE_DEVICE_ID: &str = "line-0";

pub struct LineScanner<R> {
    // Shared with the reader task so a stopped capture can be restarted on the
    // same source without losing buffered input.
    lines: Arc<tokio::sync::Mutex<Lines<R>>>,
    // Last line handed to a capture and not yet known to be received.
    unclaimed: Arc<Mutex<Option<String>>>,
    label: String,
    active: Mutex<Option<ScopedTask>>,
    exhausted: Arc<AtomicBool>,
}

impl<R> LineScanner<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            lines: Arc::new(tokio::sync::Mutex::new(reader.lines())),
            unclaimed: Arc::new(Mutex::new(None)),
            label: label.into(),
            active: Mutex::new(None),
            exhausted: Arc::new(AtomicBool::new(false)),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ScopedTask>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<R> Scanner for LineScanner<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, String> {
        if self.exhausted.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(vec![CameraDevice {
            id: LINE_DEVICE_ID.to_string(),
            label: self.label.clone(),
        }])
    }

    async fn probe_capture(&self) -> Result<(), String> {
        Err("NotFoundError: input source closed".to_string())
    }

    async fn start(&self, device_id: &str) -> Result<mpsc::Receiver<String>, String> {
        if device_id != LINE_DEVICE_ID {
            return Err(format!("NotFoundError: unknown device {device_id}"));
        }
        if self.exhausted.load(Ordering::SeqCst) {
            return Err("NotFoundError: input source closed".to_string());
        }

        let mut active = self.active();
        if active.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err("NotReadableError: device already in use".to_string());
        }

        // A single slot: a free slot means the previous line was received.
        let (tx, rx) = mpsc::channel(1);
        let handoff = Handoff {
            lines: self.lines.clone(),
            unclaimed: self.unclaimed.clone(),
            exhausted: self.exhausted.clone(),
        };
        *active = Some(ScopedTask::spawn("line_scanner", move |cancel| {
            handoff.run(tx, cancel)
        }));
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), String> {
        let task = self.active().take();
        if let Some(task) = task {
            task.shutdown().await;
        }
        Ok(())
    }

    fn is_scanning(&self) -> bool {
        self.active()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

struct Handoff<R> {
    lines: Arc<tokio::sync::Mutex<Lines<R>>>,
    unclaimed: Arc<Mutex<Option<String>>>,
    exhausted: Arc<AtomicBool>,
}

impl<R> Handoff<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn unclaimed(&self) -> MutexGuard<'_, Option<String>> {
        self.unclaimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run(self, tx: mpsc::Sender<String>, cancel: CancellationToken) {
        let mut lines = self.lines.lock().await;
        let mut replay = self.unclaimed().clone();

        loop {
            // Fails once the receiver is gone; the last line then stays unclaimed.
            let permit = tokio::select! {
                biased;
                permit = tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = cancel.cancelled() => break,
            };

            let line = match replay.take() {
                Some(line) => line,
                None => {
                    // The slot is free again, so the previous line was received.
                    *self.unclaimed() = None;
                    // `next_line` is cancel safe, so a stop never drops a half-read line.
                    let line = tokio::select! {
                        _ = cancel.cancelled() => break,
                        line = lines.next_line() => line,
                    };
                    match line {
                        Ok(Some(line)) => line,
                        Ok(None) => {
                            tracing::info!("scanner input closed");
                            self.exhausted.store(true, Ordering::SeqCst);
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "scanner input failed");
                            self.exhausted.store(true, Ordering::SeqCst);
                            break;
                        }
                    }
                }
            };

            *self.unclaimed() = Some(line.clone());
            permit.send(line);
        }
    }
}
