// Scan station: a front-desk check-in loop fed by a line-oriented reader.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::BufReader;
use tokio::sync::{broadcast, watch};

use crate::domain::{CameraError, ClientError, Scanner, ScanResult, Visibility};
use crate::frameworks::config::{self, StationConfig};
use crate::interface_adapters::{ApiClient, FileStore, LineScanner};
use crate::use_cases::{
    AuthEvent, CheckInMarkers, ScanDeps, ScanPipeline, SessionStore, SessionVault,
};

#[derive(Debug, Error)]
pub enum StationError {
    #[error("invalid CHECKIN_API_URL: {0}")]
    InvalidApiUrl(#[from] url::ParseError),
    #[error("CHECKIN_EVENT_ID must be set")]
    MissingEventId,
    #[error("no stored session; set CHECKIN_USERNAME and CHECKIN_PASSWORD")]
    MissingCredentials,
    #[error("account {0} is not an administrator")]
    NotAdmin(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error("session was revoked by the backend")]
    SessionRevoked,
    #[error(transparent)]
    Client(#[from] ClientError),
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run() {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match StationConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return;
        }
    };
    tracing::debug!(api_url = %config.api_url, storage = %config.storage_path.display(), "station configured");

    let scanner = Arc::new(LineScanner::new(BufReader::new(tokio::io::stdin()), "stdin"));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match run_with_config(config, scanner, shutdown).await {
        Ok(results) => tracing::info!(scans = results.len(), "scan station stopped"),
        Err(e) => tracing::error!(error = %e, "scan station failed"),
    }
}

/// Signs in (restoring a stored session first), then scans until the input
/// ends, `shutdown` resolves or the backend revokes the session.
pub async fn run_with_config(
    config: StationConfig,
    scanner: Arc<dyn Scanner>,
    shutdown: impl Future<Output = ()>,
) -> Result<Vec<ScanResult>, StationError> {
    let event_id = config.event_id.clone().ok_or(StationError::MissingEventId)?;
    let storage = Arc::new(FileStore::open(&config.storage_path).map_err(StationError::Storage)?);
    let vault = Arc::new(SessionVault::new(storage.clone()));
    let api = Arc::new(ApiClient::new(
        config.api_url.as_str(),
        config.http_timeout,
        vault.clone(),
    )?);
    let sessions = SessionStore::new(api.clone(), vault.clone());

    let session = match sessions.restore_from_persisted().await {
        Some(session) => session,
        None => match (config.username.as_deref(), config.password.as_deref()) {
            (Some(username), Some(password)) => sessions.login(username, password).await?,
            _ => return Err(StationError::MissingCredentials),
        },
    };
    if !session.is_admin() {
        return Err(StationError::NotAdmin(session.username));
    }
    tracing::info!(user = %session.display_name, event_id = %event_id, "scan station ready");

    // A terminal station never goes to the background.
    let (_visibility_tx, visibility) = watch::channel(Visibility::Visible);
    let deps = ScanDeps {
        api,
        scanner,
        markers: CheckInMarkers::new(storage),
    };
    let mut pipeline = ScanPipeline::mount(
        event_id,
        deps,
        config::SCANNER_STATS_POLL,
        visibility,
    );
    let mut auth_events = sessions.subscribe();

    let outcome = scan_until_done(&mut pipeline, &mut auth_events, shutdown).await;
    pipeline.unmount().await;
    outcome
}

async fn scan_until_done(
    pipeline: &mut ScanPipeline,
    auth_events: &mut broadcast::Receiver<AuthEvent>,
    shutdown: impl Future<Output = ()>,
) -> Result<Vec<ScanResult>, StationError> {
    tokio::pin!(shutdown);
    let mut results = Vec::new();

    pipeline.start_scanning().await.map_err(ClientError::from)?;

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("shutdown requested");
                return Ok(results);
            }
            event = auth_events.recv() => {
                if let Ok(AuthEvent::SessionRevoked) = event {
                    return Err(StationError::SessionRevoked);
                }
                continue;
            }
            result = pipeline.next_scan() => result.cloned(),
        };

        let Some(result) = next else {
            return Ok(results);
        };
        report(&result, pipeline);
        results.push(result);

        match pipeline.continue_scanning().await {
            Ok(()) => {}
            // The line source is gone; nothing left to scan.
            Err(CameraError::NotFound) => return Ok(results),
            Err(e) => return Err(ClientError::from(e).into()),
        }
    }
}

fn report(result: &ScanResult, pipeline: &ScanPipeline) {
    if result.is_success() {
        let name = result.attendee_name.as_deref().unwrap_or("attendee");
        println!("OK   {name}: {}", result.message);
    } else {
        println!("FAIL {}", result.message);
    }
    if let Some(stats) = pipeline.stats() {
        println!(
            "     {}/{} checked in ({}%)",
            stats.checked_in,
            stats.total,
            stats.attendance_percent()
        );
    }
}
