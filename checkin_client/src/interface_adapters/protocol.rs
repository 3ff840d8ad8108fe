use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::NewParticipant;

#[derive(Serialize)]
pub struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub struct LoginResponse {
    // Bearer token; `token_type` is always "bearer" and ignored.
    pub access_token: String,
}

#[derive(Serialize)]
pub struct CheckInRequest<'a> {
    // Decoded QR payload, forwarded verbatim.
    pub qr_code: &'a str,
    pub event_id: &'a str,
}

#[derive(Serialize)]
pub struct BulkParticipantsRequest<'a> {
    pub participants: &'a [NewParticipant],
}

// FastAPI error body. `detail` is a string for handled errors and a list of
// `{loc, msg, type}` entries for request validation failures.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        match self.detail? {
            Value::String(message) => Some(message),
            Value::Array(entries) => {
                let messages: Vec<String> = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        }
    }
}
