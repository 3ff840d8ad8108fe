// Scan-to-check-in pipeline: camera capture coordinated with the check-in call.
//
// Idle -> RequestingCamera -> Scanning -> Submitting -> ResultDisplayed -> (continue) -> Scanning

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::domain::{
    CameraDevice, CameraError, CheckInApi, CheckInStats, Scanner, ScanResult, Visibility,
};
use crate::use_cases::markers::CheckInMarkers;
use crate::use_cases::stats::StatsPoller;

const CHECK_IN_FAILED: &str = "check-in failed, please retry";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    RequestingCamera,
    Scanning,
    Submitting,
    ResultDisplayed,
}

/// Collaborators shared by every scan screen instance.
#[derive(Clone)]
pub struct ScanDeps {
    pub api: Arc<dyn CheckInApi>,
    pub scanner: Arc<dyn Scanner>,
    pub markers: CheckInMarkers,
}

/// One mounted scan screen. It exclusively owns the camera while scanning and
/// must be unmounted (or dropped) to release it.
pub struct ScanPipeline {
    event_id: String,
    deps: ScanDeps,
    phase: ScanPhase,
    decoded: Option<mpsc::Receiver<String>>,
    active_device: Option<CameraDevice>,
    result: Option<ScanResult>,
    camera_error: Option<CameraError>,
    scanning_tx: watch::Sender<bool>,
    stats: Option<StatsPoller>,
}

impl ScanPipeline {
    /// Mounts the screen and starts the background stats poller.
    pub fn mount(
        event_id: impl Into<String>,
        deps: ScanDeps,
        stats_period: Duration,
        visibility: watch::Receiver<Visibility>,
    ) -> Self {
        let event_id = event_id.into();
        let (scanning_tx, scanning_rx) = watch::channel(false);
        let stats = StatsPoller::spawn(
            deps.api.clone(),
            event_id.clone(),
            stats_period,
            scanning_rx,
            visibility,
        );

        Self {
            event_id,
            deps,
            phase: ScanPhase::Idle,
            decoded: None,
            active_device: None,
            result: None,
            camera_error: None,
            scanning_tx,
            stats: Some(stats),
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&ScanResult> {
        self.result.as_ref()
    }

    pub fn camera_error(&self) -> Option<&CameraError> {
        self.camera_error.as_ref()
    }

    pub fn active_device(&self) -> Option<&CameraDevice> {
        self.active_device.as_ref()
    }

    pub fn stats(&self) -> Option<CheckInStats> {
        self.stats.as_ref().and_then(StatsPoller::latest)
    }

    pub fn subscribe_stats(&self) -> Option<watch::Receiver<Option<CheckInStats>>> {
        self.stats.as_ref().map(StatsPoller::subscribe)
    }

    /// Advisory only; never consulted before submitting.
    pub fn seen_before(&self, attendee_id: &str) -> bool {
        self.deps.markers.is_marked(&self.event_id, attendee_id)
    }

    #[tracing::instrument(name = "start_scanning", skip(self), fields(event_id = %self.event_id))]
    pub async fn start_scanning(&mut self) -> Result<(), CameraError> {
        match self.phase {
            ScanPhase::Scanning => return Ok(()),
            ScanPhase::RequestingCamera | ScanPhase::Submitting => {
                tracing::debug!(phase = ?self.phase, "start ignored while busy");
                return Ok(());
            }
            ScanPhase::Idle | ScanPhase::ResultDisplayed => {}
        }

        self.camera_error = None;
        self.phase = ScanPhase::RequestingCamera;

        match self.acquire_camera().await {
            Ok(()) => {
                self.phase = ScanPhase::Scanning;
                self.scanning_tx.send_replace(true);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera unavailable");
                self.phase = ScanPhase::Idle;
                self.camera_error = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn acquire_camera(&mut self) -> Result<(), CameraError> {
        let devices = self.deps.scanner.list_cameras().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "camera enumeration failed");
            Vec::new()
        });

        if devices.is_empty() {
            // Tell "no camera at all" apart from "a camera nobody could label".
            return Err(match self.deps.scanner.probe_capture().await {
                Ok(()) => CameraError::Unidentified,
                Err(raw) => match CameraError::classify(&raw) {
                    CameraError::Unknown(_) => CameraError::NotFound,
                    classified => classified,
                },
            });
        }

        let device = select_camera(&devices).clone();
        let decoded = self
            .deps
            .scanner
            .start(&device.id)
            .await
            .map_err(|raw| CameraError::classify(&raw))?;

        tracing::info!(device = %device.label, "camera started");
        self.active_device = Some(device);
        self.decoded = Some(decoded);
        Ok(())
    }

    /// Waits for the next decoded payload and runs it through check-in.
    ///
    /// Capture is stopped before the request goes out, so one scan burst yields
    /// one submission. Returns `None` when not scanning or when the capture
    /// stream ended.
    pub async fn next_scan(&mut self) -> Option<&ScanResult> {
        if self.phase != ScanPhase::Scanning {
            return None;
        }

        let payload = loop {
            let decoded = self.decoded.as_mut()?;
            match decoded.recv().await {
                Some(payload) => {
                    let payload = payload.trim().to_string();
                    if !payload.is_empty() {
                        break payload;
                    }
                }
                None => {
                    tracing::info!("capture stream ended");
                    self.stop_scanning().await;
                    return None;
                }
            }
        };

        self.release_camera().await;
        self.phase = ScanPhase::Submitting;
        let result = self.submit(&payload).await;
        self.phase = ScanPhase::ResultDisplayed;
        self.result = Some(result);

        if let Some(stats) = &self.stats {
            stats.refresh_now();
        }
        self.result.as_ref()
    }

    #[tracing::instrument(name = "check_in", skip_all, fields(event_id = %self.event_id))]
    async fn submit(&self, payload: &str) -> ScanResult {
        match self.deps.api.check_in(payload, &self.event_id).await {
            Ok(receipt) => {
                if receipt.success {
                    if let Some(attendee_id) = receipt.user_id.as_deref() {
                        self.deps.markers.mark(&self.event_id, attendee_id);
                    }
                }
                tracing::info!(success = receipt.success, "check-in answered");
                ScanResult::from(receipt)
            }
            Err(e) => {
                tracing::warn!(error = %e, "check-in request failed");
                ScanResult::failure(e.user_message(CHECK_IN_FAILED))
            }
        }
    }

    /// Clears the displayed result and re-acquires the camera.
    pub async fn continue_scanning(&mut self) -> Result<(), CameraError> {
        self.result = None;
        if self.phase == ScanPhase::ResultDisplayed {
            self.phase = ScanPhase::Idle;
        }
        self.start_scanning().await
    }

    pub async fn stop_scanning(&mut self) {
        self.release_camera().await;
        if matches!(self.phase, ScanPhase::Scanning | ScanPhase::RequestingCamera) {
            self.phase = ScanPhase::Idle;
        }
    }

    async fn release_camera(&mut self) {
        self.decoded = None;
        if self.active_device.take().is_some() {
            if let Err(e) = self.deps.scanner.stop().await {
                tracing::warn!(error = %e, "failed to stop camera");
            }
        }
        self.scanning_tx.send_replace(false);
    }

    /// Tears the screen down: releases the camera and cancels the stats poller.
    pub async fn unmount(mut self) {
        self.stop_scanning().await;
        if let Some(stats) = self.stats.take() {
            stats.shutdown().await;
        }
    }
}

impl Drop for ScanPipeline {
    fn drop(&mut self) {
        // Best-effort release when the owner skipped `unmount`.
        if self.active_device.take().is_some() {
            let scanner = self.deps.scanner.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = scanner.stop().await {
                            tracing::warn!(error = %e, "failed to stop camera on drop");
                        }
                    });
                }
                Err(_) => tracing::warn!("scan pipeline dropped outside a runtime; camera left running"),
            }
        }
    }
}

// Prefers a rear-facing camera by label, falling back to the first device.
fn select_camera(devices: &[CameraDevice]) -> &CameraDevice {
    devices
        .iter()
        .find(|device| {
            let label = device.label.to_lowercase();
            label.contains("back") || label.contains("rear")
        })
        .unwrap_or(&devices[0])
}
