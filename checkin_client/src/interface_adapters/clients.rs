use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::domain::{
    AttendanceStatus, CheckInApi, CheckInReceipt, ClientError, CredentialProvider, Event,
    EventPayload, EventSummary, Identity, NewParticipant, Participant, ParticipantLink,
    ParticipantList, QrCredential, QrRequest,
};
use crate::interface_adapters::protocol::{
    BulkParticipantsRequest, CheckInRequest, ErrorBody, LoginForm, LoginResponse,
};

const SESSION_EXPIRED: &str = "session expired, please sign in again";

// Thin reqwest wrapper for the check-in backend. Every request goes through
// `send`, which attaches the bearer credential and applies the 401 policy.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Option<Duration>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ClientError::validation("base_url", err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::validation("base_url", "must be a hierarchical URL"));
        }
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // Each segment is percent-encoded, so ids and tokens stay one path segment.
    // A trailing "" yields a trailing slash.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let token = self.credentials.bearer_token();
        let held_credential = token.is_some();
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        self.dispatch(request, held_credential).await
    }

    // Unauthenticated call; a 401 here is a plain auth failure and never
    // touches the held session.
    async fn send_anonymous(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        self.dispatch(request, false).await
    }

    async fn dispatch(
        &self,
        request: RequestBuilder,
        held_credential: bool,
    ) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Keep the FastAPI `detail` so forms can show it inline.
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(ErrorBody::into_message);

        if status == StatusCode::UNAUTHORIZED {
            if held_credential {
                tracing::warn!("backend rejected credential; signing out");
                self.credentials.revoke();
            }
            return Err(ClientError::Auth(
                message.unwrap_or_else(|| SESSION_EXPIRED.to_string()),
            ));
        }

        tracing::debug!(status = status.as_u16(), ?message, "upstream error");
        Err(ClientError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let response = self.send(self.http.get(self.url(segments))).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response
        .json::<T>()
        .await
        .map_err(|err| ClientError::Decode(err.to_string()))
}

#[async_trait]
impl CheckInApi for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let request = self
            .http
            .post(self.url(&["auth", "login"]))
            .form(&LoginForm { username, password });
        let response = self.send_anonymous(request).await?;
        let body: LoginResponse = decode(response).await?;
        Ok(body.access_token)
    }

    async fn current_identity(&self) -> Result<Identity, ClientError> {
        self.get_json(&["auth", "me"]).await
    }

    async fn list_events(&self) -> Result<Vec<EventSummary>, ClientError> {
        self.get_json(&["events", ""]).await
    }

    async fn get_event(&self, event_id: &str) -> Result<Event, ClientError> {
        self.get_json(&["events", event_id]).await
    }

    async fn create_event(&self, payload: &EventPayload) -> Result<Event, ClientError> {
        let request = self.http.post(self.url(&["events", ""])).json(payload);
        decode(self.send(request).await?).await
    }

    async fn update_event(
        &self,
        event_id: &str,
        payload: &EventPayload,
    ) -> Result<Event, ClientError> {
        let request = self
            .http
            .put(self.url(&["events", event_id]))
            .json(payload);
        decode(self.send(request).await?).await
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), ClientError> {
        // 204 No Content; nothing to decode.
        let request = self.http.delete(self.url(&["events", event_id]));
        self.send(request).await?;
        Ok(())
    }

    async fn event_qr(&self, event_id: &str) -> Result<QrCredential, ClientError> {
        self.get_json(&["events", event_id, "qr"]).await
    }

    async fn attendance_status(&self, event_id: &str) -> Result<AttendanceStatus, ClientError> {
        self.get_json(&["events", event_id, "status"]).await
    }

    async fn generate_qr(
        &self,
        event_id: &str,
        request: &QrRequest,
    ) -> Result<QrCredential, ClientError> {
        let request = self
            .http
            .post(self.url(&["events", event_id, "qr", "generate"]))
            .json(request);
        decode(self.send(request).await?).await
    }

    async fn check_in(&self, qr_code: &str, event_id: &str) -> Result<CheckInReceipt, ClientError> {
        let request = self
            .http
            .post(self.url(&["admin", "checkin"]))
            .json(&CheckInRequest { qr_code, event_id });
        decode(self.send(request).await?).await
    }

    async fn create_participant(
        &self,
        event_id: &str,
        participant: &NewParticipant,
    ) -> Result<Participant, ClientError> {
        let request = self
            .http
            .post(self.url(&["participants", "events", event_id]))
            .json(participant);
        decode(self.send(request).await?).await
    }

    async fn create_participants_bulk(
        &self,
        event_id: &str,
        participants: &[NewParticipant],
    ) -> Result<ParticipantList, ClientError> {
        let request = self
            .http
            .post(self.url(&["participants", "events", event_id, "bulk"]))
            .json(&BulkParticipantsRequest { participants });
        decode(self.send(request).await?).await
    }

    async fn list_participants(&self, event_id: &str) -> Result<ParticipantList, ClientError> {
        self.get_json(&["participants", "events", event_id])
            .await
    }

    async fn verify_participant(&self, token: &str) -> Result<ParticipantLink, ClientError> {
        self.get_json(&["participants", "verify", token]).await
    }
}
