// src/services/allocator.rs

//! Registration identifier allocation.
//!
//! The next id is derived from the most recently created participant, so two
//! concurrent registrations can compute the same value. The store's unique
//! constraint on `registration_id` is the final authority; `insert_with_retry`
//! re-reads and tries again when it loses that race.

use std::time::Duration;

use rand::Rng;

use crate::{
    config::RegistrationConfig,
    error::AppError,
    models::participant::{NewParticipant, Participant},
    store::ParticipantStore,
};

#[derive(Debug, Clone)]
pub struct IdAllocator {
    prefix: String,
    floor: u64,
    max_attempts: u32,
}

impl IdAllocator {
    pub fn new(config: &RegistrationConfig) -> Self {
        Self {
            prefix: config.prefix.trim_end_matches('-').to_string(),
            floor: config.start,
            max_attempts: config.max_attempts.max(1),
        }
    }

    pub fn format(&self, sequence: u64) -> String {
        format!("{}-{}", self.prefix, sequence)
    }

    /// Numeric suffix after the last `-`. Anything else is malformed.
    pub fn parse(&self, registration_id: &str) -> Option<u64> {
        let (_, suffix) = registration_id.rsplit_once('-')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    /// Sequence number following `latest`, never below the configured floor.
    pub fn next_sequence(&self, latest: Option<&str>) -> u64 {
        latest
            .and_then(|id| self.parse(id))
            .map(|n| n.saturating_add(1).max(self.floor))
            .unwrap_or(self.floor)
    }

    /// Contiguous ids for a bulk import, continuing from `latest`.
    pub fn block(&self, latest: Option<&str>, count: usize) -> Vec<String> {
        let start = self.next_sequence(latest);
        (0..count as u64).map(|i| self.format(start + i)).collect()
    }

    /// Advisory: reads the latest id and proposes the next one.
    pub async fn allocate<S>(&self, store: &S) -> Result<String, AppError>
    where
        S: ParticipantStore + ?Sized,
    {
        let latest = store.latest_registration_id().await?;
        Ok(self.format(self.next_sequence(latest.as_deref())))
    }

    /// Inserts `template` under a freshly allocated id, re-allocating whenever
    /// the insert hits the uniqueness constraint.
    pub async fn insert_with_retry<S>(
        &self,
        store: &S,
        mut template: NewParticipant,
    ) -> Result<Participant, AppError>
    where
        S: ParticipantStore + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            template.registration_id = self.allocate(store).await?;

            match store.insert_participant(template.clone()).await {
                Ok(participant) => return Ok(participant),
                Err(e) if e.is_duplicate() => {
                    tracing::warn!(
                        registration_id = %template.registration_id,
                        attempt,
                        "Registration id already taken, re-allocating"
                    );
                    let backoff = rand::thread_rng().gen_range(2..20);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(
            attempts = self.max_attempts,
            "Gave up allocating a registration id"
        );
        Err(AppError::Conflict(
            "Could not allocate a registration id, please retry".to_string(),
        ))
    }
}
