use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::entities::{
    AttendanceStatus, CameraDevice, CheckInReceipt, Event, EventPayload, EventSummary, Identity,
    NewParticipant, Participant, ParticipantLink, ParticipantList, QrCredential, QrRequest,
};
use crate::domain::errors::ClientError;

// Port for the check-in backend. Use cases depend on this trait, never on the
// concrete HTTP client.
#[async_trait]
pub trait CheckInApi: Send + Sync {
    // Exchanges username/password for an access token.
    async fn login(&self, username: &str, password: &str) -> Result<String, ClientError>;
    async fn current_identity(&self) -> Result<Identity, ClientError>;

    async fn list_events(&self) -> Result<Vec<EventSummary>, ClientError>;
    async fn get_event(&self, event_id: &str) -> Result<Event, ClientError>;
    async fn create_event(&self, payload: &EventPayload) -> Result<Event, ClientError>;
    async fn update_event(
        &self,
        event_id: &str,
        payload: &EventPayload,
    ) -> Result<Event, ClientError>;
    async fn delete_event(&self, event_id: &str) -> Result<(), ClientError>;

    async fn event_qr(&self, event_id: &str) -> Result<QrCredential, ClientError>;
    async fn attendance_status(&self, event_id: &str) -> Result<AttendanceStatus, ClientError>;
    async fn generate_qr(
        &self,
        event_id: &str,
        request: &QrRequest,
    ) -> Result<QrCredential, ClientError>;

    async fn check_in(&self, qr_code: &str, event_id: &str) -> Result<CheckInReceipt, ClientError>;

    async fn create_participant(
        &self,
        event_id: &str,
        participant: &NewParticipant,
    ) -> Result<Participant, ClientError>;
    async fn create_participants_bulk(
        &self,
        event_id: &str,
        participants: &[NewParticipant],
    ) -> Result<ParticipantList, ClientError>;
    async fn list_participants(&self, event_id: &str) -> Result<ParticipantList, ClientError>;
    async fn verify_participant(&self, token: &str) -> Result<ParticipantLink, ClientError>;
}

// Capability handed to the HTTP boundary so every call participates in the
// global auth-failure policy.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
    // Called when the backend rejected the credential (HTTP 401).
    fn revoke(&self);
}

// Port for persisted client-side key/value state (browser local storage).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str) -> Result<(), String>;
}

// Port for a camera-backed code reader. Failures are raw driver strings;
// the scan pipeline classifies them.
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, String>;
    // Generic capture request used when no device could be enumerated.
    async fn probe_capture(&self) -> Result<(), String>;
    // Starts capture on a device; decoded payloads arrive on the returned channel.
    async fn start(&self, device_id: &str) -> Result<mpsc::Receiver<String>, String>;
    async fn stop(&self) -> Result<(), String>;
    fn is_scanning(&self) -> bool;
}
