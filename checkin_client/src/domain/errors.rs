use thiserror::Error;

// Client-level error taxonomy shared by every workflow.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClientError {
    // Bad credentials or a session the backend no longer accepts.
    #[error("authentication failed: {0}")]
    Auth(String),
    // Required form field missing or malformed; raised before any request.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream error {status}{}", message_suffix(.message))]
    Upstream {
        status: u16,
        message: Option<String>,
    },
    #[error("response decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("credential expired or invalid: {0}")]
    CredentialExpiredOrInvalid(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ClientError::Validation {
            field,
            message: message.into(),
        }
    }

    // Message provided by the backend or the validator, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Auth(message)
            | ClientError::CredentialExpiredOrInvalid(message)
            | ClientError::Validation { message, .. } => Some(message),
            ClientError::Upstream { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    // Inline message for the control that triggered the call.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

// Classified camera acquisition failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera access denied; grant camera permission and use a secure (HTTPS) origin")]
    PermissionDenied,
    #[error("no camera device found; make sure the device has a camera")]
    NotFound,
    #[error("camera is already in use by another application; close it and retry")]
    DeviceBusy,
    // A capture probe succeeded but no device could be enumerated.
    #[error("camera detected but could not be identified; reload and retry")]
    Unidentified,
    #[error("camera failed to start: {0}")]
    Unknown(String),
}

impl CameraError {
    // Maps a raw driver/library failure string onto the taxonomy.
    pub fn classify(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.contains("permission") || lowered.contains("notallowed") {
            CameraError::PermissionDenied
        } else if lowered.contains("notfound")
            || lowered.contains("not found")
            || lowered.contains("no video device")
        {
            CameraError::NotFound
        } else if lowered.contains("notreadable")
            || lowered.contains("in use")
            || lowered.contains("busy")
        {
            CameraError::DeviceBusy
        } else {
            CameraError::Unknown(raw.to_string())
        }
    }
}
