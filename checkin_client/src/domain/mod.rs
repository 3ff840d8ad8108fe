// Domain layer: client-side records, error taxonomy and ports.

pub mod entities;
pub mod errors;
pub mod ports;

pub use entities::{
    AttendanceStatus, CameraDevice, CheckInReceipt, CheckInStats, Event, EventPayload,
    EventSummary, Identity, NewParticipant, Participant, ParticipantLink, ParticipantList,
    QrCredential, QrRequest, Role, ScanOutcome, ScanResult, Session, Visibility,
};
pub use errors::{CameraError, ClientError};
pub use ports::{CheckInApi, CredentialProvider, KeyValueStore, Scanner};
