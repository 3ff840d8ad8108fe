use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// The serde derives in this layer are a dependency leak, but most of these records
// mirror the backend payloads one-to-one, so the wire shape lives here.

// Account role as reported by the identity endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Participant,
    Admin,
}

// Identity returned by `GET /auth/me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl Identity {
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::Participant
        }
    }

    // Falls back to the login name when no full name was registered.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

// Authenticated session held by the session store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

impl Session {
    pub fn new(token: String, identity: &Identity) -> Self {
        Self {
            token,
            username: identity.username.clone(),
            display_name: identity.display_name().to_string(),
            role: identity.role(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Foreground state of the viewing surface. Publishers send transitions only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

// Row of the event listing (`GET /events/`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EventSummary {
    pub id: String,
    pub name: String,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    pub is_active: bool,
    #[serde(default)]
    pub attendee_count: Option<u32>,
    #[serde(default)]
    pub checked_in_count: Option<u32>,
}

// Full event record (`GET /events/{id}`), including the live counters.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    pub is_active: bool,
    #[serde(default)]
    pub attendee_count: Option<u32>,
    #[serde(default)]
    pub checked_in_count: Option<u32>,
}

// Validated event body for create/update calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EventPayload {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_active: bool,
}

// Time-limited check-in credential issued by the backend.
// The client displays and re-requests it; it never parses the token.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct QrCredential {
    pub qr_code: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

// Self-service credential request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QrRequest {
    pub name: String,
    pub email: Option<String>,
}

// Personal attendance record (`GET /events/{id}/status`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AttendanceStatus {
    pub event_id: String,
    pub is_checked_in: bool,
    #[serde(default)]
    pub checked_in_at: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub qr_code: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub share_link: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ParticipantList {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub total: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewParticipant {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewParticipant {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
        }
    }
}

// Shared-link verification result (`GET /participants/verify/{token}`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ParticipantLink {
    pub valid: bool,
    #[serde(default)]
    pub participant_name: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub event_location: Option<String>,
    #[serde(default)]
    pub event_description: Option<String>,
    #[serde(default)]
    pub is_checked_in: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// Raw check-in verdict returned by `POST /admin/checkin`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CheckInReceipt {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub checked_in_at: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    Success,
    Failure,
}

// Outcome of one scan attempt, held for display until the next scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanResult {
    pub outcome: ScanOutcome,
    pub message: String,
    pub attendee_id: Option<String>,
    pub attendee_name: Option<String>,
    pub attendee_email: Option<String>,
    pub event_name: Option<String>,
    pub checked_in_at: Option<String>,
}

impl ScanResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            outcome: ScanOutcome::Failure,
            message: message.into(),
            attendee_id: None,
            attendee_name: None,
            attendee_email: None,
            event_name: None,
            checked_in_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ScanOutcome::Success
    }
}

impl From<CheckInReceipt> for ScanResult {
    fn from(receipt: CheckInReceipt) -> Self {
        // Attendee details only accompany an accepted check-in.
        if !receipt.success {
            return ScanResult::failure(receipt.message);
        }

        Self {
            outcome: ScanOutcome::Success,
            message: receipt.message,
            attendee_id: receipt.user_id,
            attendee_name: receipt.user_name,
            attendee_email: receipt.user_email,
            event_name: receipt.event_name,
            checked_in_at: receipt.checked_in_at,
        }
    }
}

// Live counter shown next to the scanner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckInStats {
    pub total: u32,
    pub checked_in: u32,
}

impl CheckInStats {
    pub fn attendance_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((f64::from(self.checked_in) / f64::from(self.total)) * 100.0).round() as u32
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
}
