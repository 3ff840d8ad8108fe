// In-process stand-in for the check-in backend, one instance per test.
#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

pub const ADMIN_TOKEN: &str = "token-admin";
pub const GUEST_TOKEN: &str = "token-guest";
pub const EVENT_ID: &str = "evt-1";
// Credential the backend accepts at the check-in desk.
pub const ADA_QR: &str = "qr-ada";
pub const ADA_SHARE_TOKEN: &str = "share-ada";

#[derive(Default)]
pub struct BackendState {
    // "METHOD /path" for every request, in arrival order.
    requests: Mutex<Vec<String>>,
    // When set, every bearer token is rejected with 401.
    expired: AtomicBool,
    checked_in: Mutex<HashSet<String>>,
}

pub struct MockBackend {
    // Base URL including the `/api` prefix, as the client expects it.
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().expect("requests lock").clone()
    }

    pub fn count(&self, request: &str) -> usize {
        self.requests().iter().filter(|r| *r == request).count()
    }

    // Simulates the backend expiring every issued token.
    pub fn expire_tokens(&self) {
        self.state.expired.store(true, Ordering::SeqCst);
    }
}

// Bind to an ephemeral port and serve on the calling test's runtime.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(BackendState::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");

    let app = Router::new().nest("/api", routes()).with_state(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend failed");
    });

    MockBackend {
        base_url: format!("http://{addr}/api"),
        state,
    }
}

fn routes() -> Router<Arc<BackendState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/events/", get(list_events).post(create_event))
        .route("/events/{event_id}", get(get_event).delete(delete_event))
        .route("/participants/events/{event_id}", get(list_participants))
        .route("/participants/verify/{token}", get(verify))
        .route("/admin/checkin", post(check_in))
}

fn record(state: &BackendState, request: String) {
    state.requests.lock().expect("requests lock").push(request);
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

// Returns the token when the request carries one the backend still accepts.
fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<&'static str, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let unauthorized = || detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");

    if state.expired.load(Ordering::SeqCst) {
        return Err(unauthorized());
    }
    match token {
        Some(ADMIN_TOKEN) => Ok(ADMIN_TOKEN),
        Some(GUEST_TOKEN) => Ok(GUEST_TOKEN),
        _ => Err(unauthorized()),
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(state): State<Arc<BackendState>>, Form(form): Form<LoginForm>) -> Response {
    record(&state, "POST /auth/login".to_string());
    let token = match (form.username.as_str(), form.password.as_str()) {
        ("admin", "secret") => ADMIN_TOKEN,
        ("guest", "guest") => GUEST_TOKEN,
        _ => return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password"),
    };
    Json(json!({ "access_token": token, "token_type": "bearer" })).into_response()
}

async fn me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    record(&state, "GET /auth/me".to_string());
    match authorize(&state, &headers) {
        Ok(ADMIN_TOKEN) => Json(json!({
            "username": "admin",
            "full_name": "Front Desk",
            "email": "desk@example.com",
            "is_admin": true
        }))
        .into_response(),
        Ok(_) => Json(json!({ "username": "guest", "is_admin": false })).into_response(),
        Err(rejection) => rejection,
    }
}

fn event_json(event_id: &str, name: &str, checked_in: usize) -> Value {
    json!({
        "id": event_id,
        "name": name,
        "description": null,
        "location": "Hall A",
        "event_date": "2026-10-15",
        "start_time": "09:30:00",
        "end_time": "17:00:00",
        "created_by": "u-admin",
        "is_active": true,
        "created_at": "2026-10-01T08:00:00",
        "updated_at": "2026-10-01T08:00:00",
        "attendee_count": 2,
        "checked_in_count": checked_in
    })
}

async fn list_events(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    record(&state, "GET /events/".to_string());
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let checked_in = state.checked_in.lock().expect("checked-in lock").len();
    Json(json!([event_json(EVENT_ID, "Demo Day", checked_in)])).into_response()
}

async fn get_event(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Response {
    record(&state, format!("GET /events/{event_id}"));
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    if event_id != EVENT_ID {
        return detail(StatusCode::NOT_FOUND, "Event not found");
    }
    let checked_in = state.checked_in.lock().expect("checked-in lock").len();
    Json(event_json(&event_id, "Demo Day", checked_in)).into_response()
}

async fn create_event(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "POST /events/".to_string());
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let name = body["name"].as_str().unwrap_or_default();
    let mut event = event_json("evt-new", name, 0);
    event["event_date"] = body["event_date"].clone();
    event["start_time"] = body["start_time"].clone();
    event["end_time"] = body["end_time"].clone();
    (StatusCode::CREATED, Json(event)).into_response()
}

async fn delete_event(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Response {
    record(&state, format!("DELETE /events/{event_id}"));
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_participants(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Response {
    record(&state, format!("GET /participants/events/{event_id}"));
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(json!({
        "participants": [
            { "id": "u-ada", "name": "Ada", "email": "ada@example.com", "qr_code": ADA_QR,
              "event_id": event_id, "share_link": format!("/p/{ADA_SHARE_TOKEN}") },
            { "id": "u-grace", "name": "Grace", "qr_code": "qr-grace", "event_id": event_id }
        ],
        "total": 2
    }))
    .into_response()
}

async fn verify(State(state): State<Arc<BackendState>>, Path(token): Path<String>) -> Response {
    record(&state, format!("GET /participants/verify/{token}"));
    if token != ADA_SHARE_TOKEN {
        return Json(json!({ "valid": false, "message": "Invalid or expired link" }))
            .into_response();
    }
    let is_checked_in = state
        .checked_in
        .lock()
        .expect("checked-in lock")
        .contains("u-ada");
    Json(json!({
        "valid": true,
        "participant_name": "Ada",
        "event_id": EVENT_ID,
        "event_name": "Demo Day",
        "event_date": "2026-10-15",
        "event_time": "09:30",
        "event_location": "Hall A",
        "is_checked_in": is_checked_in
    }))
    .into_response()
}

#[derive(Deserialize)]
struct CheckInBody {
    qr_code: String,
    event_id: String,
}

async fn check_in(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<CheckInBody>,
) -> Response {
    record(&state, format!("POST /admin/checkin {}", body.qr_code));
    match authorize(&state, &headers) {
        Ok(ADMIN_TOKEN) => {}
        Ok(_) => return detail(StatusCode::FORBIDDEN, "Admin privileges required"),
        Err(rejection) => return rejection,
    }
    if body.qr_code != ADA_QR || body.event_id != EVENT_ID {
        return detail(StatusCode::BAD_REQUEST, "Invalid QR code");
    }

    let first_time = state
        .checked_in
        .lock()
        .expect("checked-in lock")
        .insert("u-ada".to_string());
    if !first_time {
        return Json(json!({
            "success": false,
            "message": "Ada is already checked in",
            "user_id": "u-ada",
            "user_name": "Ada"
        }))
        .into_response();
    }
    Json(json!({
        "success": true,
        "message": "Check-in successful",
        "user_id": "u-ada",
        "user_name": "Ada",
        "user_email": "ada@example.com",
        "event_name": "Demo Day",
        "checked_in_at": "2026-10-15T09:41:00"
    }))
    .into_response()
}
