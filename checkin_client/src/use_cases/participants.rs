// Participant management with a per-event read-through cache.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{CheckInApi, ClientError, NewParticipant, Participant, ParticipantList};

pub const BULK_LIMIT: usize = 100;
const NAME_MAX_LEN: usize = 100;
const EMAIL_MAX_LEN: usize = 255;
const PHONE_MAX_LEN: usize = 20;

pub struct ParticipantDirectory {
    api: Arc<dyn CheckInApi>,
    cache: Mutex<ListCache>,
}

// Event id -> last fetched list. Any create for the event drops its entry and
// bumps its generation, so a fetch that started before the create is not stored.
#[derive(Default)]
struct ListCache {
    lists: HashMap<String, ParticipantList>,
    generations: HashMap<String, u64>,
}

impl ListCache {
    fn generation(&self, event_id: &str) -> u64 {
        self.generations.get(event_id).copied().unwrap_or(0)
    }
}

impl ParticipantDirectory {
    pub fn new(api: Arc<dyn CheckInApi>) -> Self {
        Self {
            api,
            cache: Mutex::new(ListCache::default()),
        }
    }

    pub async fn list(&self, event_id: &str) -> Result<ParticipantList, ClientError> {
        if let Some(cached) = self.cache.lock().await.lists.get(event_id) {
            return Ok(cached.clone());
        }
        self.refresh(event_id).await
    }

    /// Bypasses the cache and stores the fresh list.
    pub async fn refresh(&self, event_id: &str) -> Result<ParticipantList, ClientError> {
        let generation = self.cache.lock().await.generation(event_id);
        let list = self.api.list_participants(event_id).await?;

        let mut cache = self.cache.lock().await;
        if cache.generation(event_id) == generation {
            cache.lists.insert(event_id.to_string(), list.clone());
        } else {
            tracing::debug!(event_id, "participant list changed during fetch, not caching");
        }
        Ok(list)
    }

    #[tracing::instrument(name = "create_participant", skip(self, participant))]
    pub async fn create(
        &self,
        event_id: &str,
        participant: NewParticipant,
    ) -> Result<Participant, ClientError> {
        let participant = normalize(participant)?;
        let created = self.api.create_participant(event_id, &participant).await?;
        self.invalidate(event_id).await;
        Ok(created)
    }

    #[tracing::instrument(name = "create_participants_bulk", skip(self, participants), fields(count = participants.len()))]
    pub async fn create_bulk(
        &self,
        event_id: &str,
        participants: Vec<NewParticipant>,
    ) -> Result<ParticipantList, ClientError> {
        if participants.is_empty() {
            return Err(ClientError::validation(
                "participants",
                "at least one participant is required",
            ));
        }
        if participants.len() > BULK_LIMIT {
            return Err(ClientError::validation(
                "participants",
                format!("at most {BULK_LIMIT} participants per request"),
            ));
        }
        let participants = participants
            .into_iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()?;

        let created = self
            .api
            .create_participants_bulk(event_id, &participants)
            .await?;
        self.invalidate(event_id).await;
        tracing::info!(created = created.total, "participants created");
        Ok(created)
    }

    async fn invalidate(&self, event_id: &str) {
        let mut cache = self.cache.lock().await;
        cache.lists.remove(event_id);
        *cache.generations.entry(event_id.to_string()).or_default() += 1;
    }
}

fn normalize(participant: NewParticipant) -> Result<NewParticipant, ClientError> {
    let name = participant.name.trim();
    if name.is_empty() {
        return Err(ClientError::validation("name", "participant name is required"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(ClientError::validation(
            "name",
            format!("participant name must be at most {NAME_MAX_LEN} characters"),
        ));
    }
    let email = optional_field("email", participant.email, EMAIL_MAX_LEN)?;
    let phone = optional_field("phone", participant.phone, PHONE_MAX_LEN)?;

    Ok(NewParticipant {
        name: name.to_string(),
        email,
        phone,
    })
}

fn optional_field(
    field: &'static str,
    value: Option<String>,
    max_len: usize,
) -> Result<Option<String>, ClientError> {
    let Some(value) = value else { return Ok(None) };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > max_len {
        return Err(ClientError::validation(
            field,
            format!("{field} must be at most {max_len} characters"),
        ));
    }
    Ok(Some(value.to_string()))
}
