// Event administration: dashboard listing and the create/edit form.

use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

use crate::domain::{CheckInApi, ClientError, Event, EventPayload, EventSummary};

const NAME_MAX_LEN: usize = 200;
const LOCATION_MAX_LEN: usize = 255;

/// Raw event form input, validated before any request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub name: String,
    pub description: String,
    pub location: String,
    pub event_date: String,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
}

impl Default for EventDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            location: String::new(),
            event_date: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            is_active: true,
        }
    }
}

impl EventDraft {
    /// Pre-fills the edit form from a stored event.
    pub fn from_event(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            description: event.description.clone().unwrap_or_default(),
            location: event.location.clone().unwrap_or_default(),
            event_date: event.event_date.format("%Y-%m-%d").to_string(),
            start_time: format_time(event.start_time),
            end_time: format_time(event.end_time),
            is_active: event.is_active,
        }
    }

    pub fn validate(&self) -> Result<EventPayload, ClientError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ClientError::validation("name", "event name is required"));
        }
        if name.chars().count() > NAME_MAX_LEN {
            return Err(ClientError::validation(
                "name",
                format!("event name must be at most {NAME_MAX_LEN} characters"),
            ));
        }

        let location = non_empty(&self.location);
        if location
            .as_ref()
            .is_some_and(|l| l.chars().count() > LOCATION_MAX_LEN)
        {
            return Err(ClientError::validation(
                "location",
                format!("location must be at most {LOCATION_MAX_LEN} characters"),
            ));
        }

        let event_date = self.event_date.trim();
        if event_date.is_empty() {
            return Err(ClientError::validation("event_date", "event date is required"));
        }
        let event_date = NaiveDate::parse_from_str(event_date, "%Y-%m-%d")
            .map_err(|_| ClientError::validation("event_date", "event date must be YYYY-MM-DD"))?;

        let start_time = parse_time("start_time", &self.start_time)?;
        let end_time = parse_time("end_time", &self.end_time)?;
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if end < start {
                return Err(ClientError::validation(
                    "end_time",
                    "end time must not be before start time",
                ));
            }
        }

        Ok(EventPayload {
            name: name.to_string(),
            description: non_empty(&self.description),
            location,
            event_date,
            start_time,
            end_time,
            is_active: self.is_active,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// Form inputs carry `HH:MM`; stored values may include seconds.
fn parse_time(field: &'static str, value: &str) -> Result<Option<NaiveTime>, ClientError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map(Some)
        .map_err(|_| ClientError::validation(field, "time must be HH:MM"))
}

fn format_time(value: Option<NaiveTime>) -> String {
    value
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct EventAdmin {
    api: Arc<dyn CheckInApi>,
}

impl EventAdmin {
    pub fn new(api: Arc<dyn CheckInApi>) -> Self {
        Self { api }
    }

    pub async fn list_events(&self) -> Result<Vec<EventSummary>, ClientError> {
        self.api.list_events().await
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Event, ClientError> {
        self.api.get_event(event_id).await
    }

    #[tracing::instrument(name = "create_event", skip_all)]
    pub async fn create_event(&self, draft: &EventDraft) -> Result<Event, ClientError> {
        let payload = draft.validate()?;
        let event = self.api.create_event(&payload).await?;
        tracing::info!(event_id = %event.id, "event created");
        Ok(event)
    }

    #[tracing::instrument(name = "update_event", skip(self, draft))]
    pub async fn update_event(&self, event_id: &str, draft: &EventDraft) -> Result<Event, ClientError> {
        let payload = draft.validate()?;
        self.api.update_event(event_id, &payload).await
    }

    #[tracing::instrument(name = "delete_event", skip(self))]
    pub async fn delete_event(&self, event_id: &str) -> Result<(), ClientError> {
        self.api.delete_event(event_id).await?;
        tracing::info!("event deleted");
        Ok(())
    }
}
