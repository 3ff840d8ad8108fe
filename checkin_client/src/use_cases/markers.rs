// Advisory "already checked in" hints kept in local storage.
// The backend verdict is authoritative; these markers never gate a submission.

use std::sync::Arc;

use crate::domain::KeyValueStore;

#[derive(Clone)]
pub struct CheckInMarkers {
    storage: Arc<dyn KeyValueStore>,
}

impl CheckInMarkers {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn key(event_id: &str, attendee_id: &str) -> String {
        format!("checked_in_{event_id}_{attendee_id}")
    }

    pub fn mark(&self, event_id: &str, attendee_id: &str) {
        if let Err(e) = self
            .storage
            .set(&Self::key(event_id, attendee_id), "true")
        {
            tracing::warn!(error = %e, event_id, "failed to record check-in marker");
        }
    }

    pub fn is_marked(&self, event_id: &str, attendee_id: &str) -> bool {
        matches!(
            self.storage.get(&Self::key(event_id, attendee_id)),
            Ok(Some(value)) if value == "true"
        )
    }
}
