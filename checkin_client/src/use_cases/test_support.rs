use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

use crate::domain::{
    AttendanceStatus, CameraDevice, CheckInApi, CheckInReceipt, ClientError, Event, EventPayload,
    EventSummary, Identity, NewParticipant, Participant, ParticipantLink, ParticipantList,
    QrCredential, QrRequest, Scanner,
};

// Ordered log shared between fakes so tests can assert cross-port sequencing.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn record(&self, entry: impl Into<String>) {
        self.0.lock().expect("journal lock").push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }
}

pub(crate) fn admin_identity() -> Identity {
    Identity {
        username: "admin".to_string(),
        full_name: Some("Front Desk".to_string()),
        email: Some("desk@example.com".to_string()),
        is_admin: true,
    }
}

pub(crate) fn demo_event() -> Event {
    Event {
        id: "evt-1".to_string(),
        name: "Demo Day".to_string(),
        description: None,
        location: Some("Hall A".to_string()),
        event_date: NaiveDate::from_ymd_opt(2026, 10, 15).expect("valid date"),
        start_time: NaiveTime::from_hms_opt(9, 30, 0),
        end_time: NaiveTime::from_hms_opt(17, 0, 0),
        is_active: true,
        attendee_count: None,
        checked_in_count: Some(1),
    }
}

fn participant(id: &str, event_id: &str, new: &NewParticipant) -> Participant {
    Participant {
        id: id.to_string(),
        name: new.name.clone(),
        email: new.email.clone(),
        phone: new.phone.clone(),
        qr_code: format!("qr-{id}"),
        event_id: Some(event_id.to_string()),
        share_link: Some(format!("/p/{id}")),
    }
}

fn accepted_receipt() -> CheckInReceipt {
    CheckInReceipt {
        success: true,
        message: "check-in successful".to_string(),
        user_id: Some("u-1".to_string()),
        user_name: Some("Ada".to_string()),
        user_email: Some("ada@example.com".to_string()),
        event_name: Some("Demo Day".to_string()),
        checked_in_at: Some("2026-10-15T09:41:00".to_string()),
    }
}

/// In-memory backend that records every call by name.
pub(crate) struct RecordingApi {
    calls: Mutex<Vec<String>>,
    login: Result<String, ClientError>,
    identity: Result<Identity, ClientError>,
    verify: ParticipantLink,
    check_in: Result<CheckInReceipt, ClientError>,
    attendee_count: Option<u32>,
    checked_in_count: Option<u32>,
    event_fails: AtomicBool,
    qr_requests: Mutex<Vec<QrRequest>>,
    created: Mutex<Vec<NewParticipant>>,
    // When set, participant lists are read first and returned only once notified.
    list_gate: Option<Arc<Notify>>,
    journal: Option<Journal>,
}

impl RecordingApi {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            login: Ok("token-admin".to_string()),
            identity: Ok(admin_identity()),
            verify: ParticipantLink {
                valid: true,
                participant_name: Some("Ada".to_string()),
                event_id: Some("evt-1".to_string()),
                event_name: Some("Demo Day".to_string()),
                ..ParticipantLink::default()
            },
            check_in: Ok(accepted_receipt()),
            attendee_count: None,
            checked_in_count: Some(1),
            event_fails: AtomicBool::new(false),
            qr_requests: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            list_gate: None,
            journal: None,
        }
    }

    pub(crate) fn with_login(mut self, login: Result<String, ClientError>) -> Self {
        self.login = login;
        self
    }

    pub(crate) fn with_identity(mut self, identity: Result<Identity, ClientError>) -> Self {
        self.identity = identity;
        self
    }

    pub(crate) fn with_verify(mut self, link: ParticipantLink) -> Self {
        self.verify = link;
        self
    }

    pub(crate) fn with_check_in(mut self, check_in: Result<CheckInReceipt, ClientError>) -> Self {
        self.check_in = check_in;
        self
    }

    pub(crate) fn with_event_counts(
        mut self,
        attendee_count: Option<u32>,
        checked_in_count: Option<u32>,
    ) -> Self {
        self.attendee_count = attendee_count;
        self.checked_in_count = checked_in_count;
        self
    }

    pub(crate) fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub(crate) fn with_list_gate(mut self, gate: Arc<Notify>) -> Self {
        self.list_gate = Some(gate);
        self
    }

    pub(crate) fn fail_event(&self, fail: bool) {
        self.event_fails.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn count_calls(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| *call == name).count()
    }

    pub(crate) fn count_prefix(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub(crate) fn qr_requests(&self) -> Vec<QrRequest> {
        self.qr_requests.lock().expect("qr lock").clone()
    }

    pub(crate) fn created_participants(&self) -> Vec<NewParticipant> {
        self.created.lock().expect("created lock").clone()
    }

    fn record(&self, call: String) {
        if let Some(journal) = &self.journal {
            journal.record(call.clone());
        }
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl CheckInApi for RecordingApi {
    async fn login(&self, _username: &str, _password: &str) -> Result<String, ClientError> {
        self.record("login".to_string());
        self.login.clone()
    }

    async fn current_identity(&self) -> Result<Identity, ClientError> {
        self.record("me".to_string());
        self.identity.clone()
    }

    async fn list_events(&self) -> Result<Vec<EventSummary>, ClientError> {
        self.record("list_events".to_string());
        let event = demo_event();
        Ok(vec![EventSummary {
            id: event.id,
            name: event.name,
            event_date: event.event_date,
            location: event.location,
            start_time: event.start_time,
            is_active: event.is_active,
            attendee_count: self.attendee_count,
            checked_in_count: self.checked_in_count,
        }])
    }

    async fn get_event(&self, event_id: &str) -> Result<Event, ClientError> {
        self.record(format!("get_event:{event_id}"));
        if self.event_fails.load(Ordering::SeqCst) {
            return Err(ClientError::Network("connection refused".to_string()));
        }
        Ok(Event {
            id: event_id.to_string(),
            attendee_count: self.attendee_count,
            checked_in_count: self.checked_in_count,
            ..demo_event()
        })
    }

    async fn create_event(&self, payload: &EventPayload) -> Result<Event, ClientError> {
        self.record(format!("create_event:{}", payload.name));
        Ok(demo_event())
    }

    async fn update_event(
        &self,
        event_id: &str,
        payload: &EventPayload,
    ) -> Result<Event, ClientError> {
        self.record(format!("update_event:{event_id}"));
        Ok(Event {
            id: event_id.to_string(),
            name: payload.name.clone(),
            ..demo_event()
        })
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), ClientError> {
        self.record(format!("delete_event:{event_id}"));
        Ok(())
    }

    async fn event_qr(&self, event_id: &str) -> Result<QrCredential, ClientError> {
        self.record(format!("event_qr:{event_id}"));
        Ok(QrCredential {
            qr_code: "qr-account".to_string(),
            expires_in: Some(30),
            generated_at: None,
        })
    }

    async fn attendance_status(&self, event_id: &str) -> Result<AttendanceStatus, ClientError> {
        self.record(format!("status:{event_id}"));
        Ok(AttendanceStatus {
            event_id: event_id.to_string(),
            is_checked_in: false,
            checked_in_at: None,
            qr_code: None,
        })
    }

    async fn generate_qr(
        &self,
        event_id: &str,
        request: &QrRequest,
    ) -> Result<QrCredential, ClientError> {
        self.record(format!("generate_qr:{event_id}"));
        self.qr_requests
            .lock()
            .expect("qr lock")
            .push(request.clone());
        Ok(QrCredential {
            qr_code: "qr-token".to_string(),
            expires_in: Some(30),
            generated_at: None,
        })
    }

    async fn check_in(&self, qr_code: &str, event_id: &str) -> Result<CheckInReceipt, ClientError> {
        self.record(format!("check_in:{qr_code}:{event_id}"));
        self.check_in.clone()
    }

    async fn create_participant(
        &self,
        event_id: &str,
        new: &NewParticipant,
    ) -> Result<Participant, ClientError> {
        self.record(format!("create_participant:{event_id}"));
        self.created.lock().expect("created lock").push(new.clone());
        Ok(participant("p-new", event_id, new))
    }

    async fn create_participants_bulk(
        &self,
        event_id: &str,
        participants: &[NewParticipant],
    ) -> Result<ParticipantList, ClientError> {
        self.record(format!("create_bulk:{event_id}:{}", participants.len()));
        self.created
            .lock()
            .expect("created lock")
            .extend_from_slice(participants);
        let participants: Vec<_> = participants
            .iter()
            .enumerate()
            .map(|(i, new)| participant(&format!("p-{i}"), event_id, new))
            .collect();
        Ok(ParticipantList {
            total: participants.len() as u32,
            participants,
        })
    }

    async fn list_participants(&self, event_id: &str) -> Result<ParticipantList, ClientError> {
        self.record(format!("list_participants:{event_id}"));
        let mut participants = vec![
            participant("p-1", event_id, &NewParticipant::named("Ada")),
            participant("p-2", event_id, &NewParticipant::named("Grace")),
        ];
        let created = self.created_participants();
        participants.extend(
            created
                .iter()
                .enumerate()
                .map(|(i, new)| participant(&format!("p-created-{i}"), event_id, new)),
        );
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        Ok(ParticipantList {
            total: participants.len() as u32,
            participants,
        })
    }

    async fn verify_participant(&self, token: &str) -> Result<ParticipantLink, ClientError> {
        self.record(format!("verify:{token}"));
        Ok(self.verify.clone())
    }
}

/// Single shared camera. A second `start` while one is active reports busy.
pub(crate) struct FakeScanner {
    cameras: Vec<CameraDevice>,
    probe: Result<(), String>,
    start_error: Option<String>,
    active: Mutex<Option<mpsc::Sender<String>>>,
    started: Mutex<Vec<String>>,
    journal: Option<Journal>,
}

impl FakeScanner {
    pub(crate) fn with_cameras(cameras: Vec<CameraDevice>) -> Self {
        Self {
            cameras,
            probe: Err("NotFoundError: Requested device not found".to_string()),
            start_error: None,
            active: Mutex::new(None),
            started: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    pub(crate) fn with_default_cameras() -> Self {
        Self::with_cameras(vec![CameraDevice {
            id: "cam-0".to_string(),
            label: "Integrated Camera".to_string(),
        }])
    }

    pub(crate) fn with_probe(mut self, probe: Result<(), String>) -> Self {
        self.probe = probe;
        self
    }

    pub(crate) fn with_start_error(mut self, raw: impl Into<String>) -> Self {
        self.start_error = Some(raw.into());
        self
    }

    pub(crate) fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Simulates the decoder reporting a payload.
    pub(crate) fn emit(&self, payload: &str) {
        if let Some(tx) = self.active.lock().expect("scanner lock").as_ref() {
            let _ = tx.try_send(payload.to_string());
        }
    }

    /// Simulates the capture source going away.
    pub(crate) fn close_stream(&self) {
        self.active.lock().expect("scanner lock").take();
    }

    pub(crate) fn started_devices(&self) -> Vec<String> {
        self.started.lock().expect("scanner lock").clone()
    }

    fn record(&self, entry: &str) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }
}

#[async_trait]
impl Scanner for FakeScanner {
    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, String> {
        Ok(self.cameras.clone())
    }

    async fn probe_capture(&self) -> Result<(), String> {
        self.record("camera:probe");
        self.probe.clone()
    }

    async fn start(&self, device_id: &str) -> Result<mpsc::Receiver<String>, String> {
        if let Some(raw) = &self.start_error {
            return Err(raw.clone());
        }
        let mut active = self.active.lock().expect("scanner lock");
        if active.is_some() {
            return Err("NotReadableError: Could not start video source".to_string());
        }
        let (tx, rx) = mpsc::channel(16);
        *active = Some(tx);
        self.started
            .lock()
            .expect("scanner lock")
            .push(device_id.to_string());
        self.record("camera:start");
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), String> {
        self.active.lock().expect("scanner lock").take();
        self.record("camera:stop");
        Ok(())
    }

    fn is_scanning(&self) -> bool {
        self.active.lock().expect("scanner lock").is_some()
    }
}
