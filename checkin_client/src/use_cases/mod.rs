// Use cases layer: client workflows for the check-in system.

pub mod admin;
pub mod attendee;
pub mod markers;
pub mod participants;
pub mod refresh;
pub mod scan;
pub mod scoped_task;
pub mod session;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::{EventAdmin, EventDraft};
pub use attendee::{AccountQrSource, AttendeeDesk, SelfServiceSource, SharedLinkSource};
pub use markers::CheckInMarkers;
pub use participants::ParticipantDirectory;
pub use refresh::{
    CredentialSource, RefreshPhase, RefreshSchedule, RefreshSnapshot, TokenRefreshLoop,
};
pub use scan::{ScanDeps, ScanPhase, ScanPipeline};
pub use scoped_task::ScopedTask;
pub use session::{AuthEvent, SessionStore, SessionVault};
pub use stats::{StatsPoller, fetch_stats};
