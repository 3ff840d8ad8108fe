// Attendee-facing workflows: event view, personal status and the credential
// sources that feed the refresh loop.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{
    AttendanceStatus, CheckInApi, ClientError, Event, ParticipantLink, QrCredential, QrRequest,
};
use crate::use_cases::refresh::CredentialSource;

const NAME_MAX_LEN: usize = 100;
const EMAIL_MAX_LEN: usize = 255;
const VERIFY_FAILED: &str = "this QR code could not be verified";

#[derive(Clone)]
pub struct AttendeeDesk {
    api: Arc<dyn CheckInApi>,
}

impl AttendeeDesk {
    pub fn new(api: Arc<dyn CheckInApi>) -> Self {
        Self { api }
    }

    pub async fn event(&self, event_id: &str) -> Result<Event, ClientError> {
        self.api.get_event(event_id).await
    }

    pub async fn attendance_status(&self, event_id: &str) -> Result<AttendanceStatus, ClientError> {
        self.api.attendance_status(event_id).await
    }
}

/// Self-service credential: the attendee supplies a name (and optional email).
#[derive(Clone)]
pub struct SelfServiceSource {
    api: Arc<dyn CheckInApi>,
    event_id: String,
    request: QrRequest,
}

impl SelfServiceSource {
    pub fn new(
        api: Arc<dyn CheckInApi>,
        event_id: impl Into<String>,
        name: &str,
        email: &str,
    ) -> Result<Self, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::validation("name", "name is required"));
        }
        if name.chars().count() > NAME_MAX_LEN {
            return Err(ClientError::validation(
                "name",
                format!("name must be at most {NAME_MAX_LEN} characters"),
            ));
        }
        let email = email.trim();
        if email.chars().count() > EMAIL_MAX_LEN {
            return Err(ClientError::validation(
                "email",
                format!("email must be at most {EMAIL_MAX_LEN} characters"),
            ));
        }

        Ok(Self {
            api,
            event_id: event_id.into(),
            request: QrRequest {
                name: name.to_string(),
                email: (!email.is_empty()).then(|| email.to_string()),
            },
        })
    }
}

#[async_trait]
impl CredentialSource for SelfServiceSource {
    type Credential = QrCredential;

    async fn fetch(&self) -> Result<QrCredential, ClientError> {
        self.api.generate_qr(&self.event_id, &self.request).await
    }
}

/// Credential of the signed-in attendee account.
#[derive(Clone)]
pub struct AccountQrSource {
    api: Arc<dyn CheckInApi>,
    event_id: String,
}

impl AccountQrSource {
    pub fn new(api: Arc<dyn CheckInApi>, event_id: impl Into<String>) -> Self {
        Self {
            api,
            event_id: event_id.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for AccountQrSource {
    type Credential = QrCredential;

    async fn fetch(&self) -> Result<QrCredential, ClientError> {
        self.api.event_qr(&self.event_id).await
    }
}

/// Shared-link view: the token in the link is verified on every refresh.
#[derive(Clone)]
pub struct SharedLinkSource {
    api: Arc<dyn CheckInApi>,
    token: String,
}

impl SharedLinkSource {
    pub fn new(api: Arc<dyn CheckInApi>, token: impl Into<String>) -> Self {
        Self {
            api,
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for SharedLinkSource {
    type Credential = ParticipantLink;

    async fn fetch(&self) -> Result<ParticipantLink, ClientError> {
        let link = self.api.verify_participant(&self.token).await?;
        if !link.valid {
            let message = link.message.unwrap_or_else(|| VERIFY_FAILED.to_string());
            return Err(ClientError::CredentialExpiredOrInvalid(message));
        }
        Ok(link)
    }
}
