// src/store/mod.rs

//! Storage collaborator.
//!
//! Handlers and services only see these traits. `PgStore` backs them with
//! PostgreSQL, `MemoryStore` keeps everything in process (tests and
//! database-less local runs). Both enforce the same uniqueness constraints and
//! report violations as `StoreError::Duplicate`.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    admin::Admin,
    audit::{AuditRecord, NewAuditRecord},
    category::Category,
    exam_session::{ExamSession, Violation},
    participant::{NewParticipant, Participant, ParticipantQuery},
    question::{AnswerKey, NewQuestion, PublicQuestion, Question},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const REGISTRATION_ID_CONSTRAINT: &str = "participants_registration_id_key";
pub const SESSION_PARTICIPANT_CONSTRAINT: &str = "exam_sessions_participant_id_key";
pub const ADMIN_USERNAME_CONSTRAINT: &str = "admins_username_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value violates {constraint}")]
    Duplicate { constraint: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Duplicate {
                    constraint: db.constraint().unwrap_or("unique").to_string(),
                };
            }
        }
        StoreError::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Registration id of the most recently created participant.
    async fn latest_registration_id(&self) -> StoreResult<Option<String>>;

    /// Fails with `Duplicate` when the registration id is taken.
    async fn insert_participant(&self, new: NewParticipant) -> StoreResult<Participant>;

    /// Inserts each item independently; one failure never aborts the rest.
    async fn insert_participants(
        &self,
        batch: Vec<NewParticipant>,
    ) -> Vec<StoreResult<Participant>> {
        let mut results = Vec::with_capacity(batch.len());
        for new in batch {
            results.push(self.insert_participant(new).await);
        }
        results
    }

    async fn find_participant_by_registration_id(
        &self,
        registration_id: &str,
    ) -> StoreResult<Option<Participant>>;

    async fn find_participant_by_id(&self, id: i64) -> StoreResult<Option<Participant>>;

    /// One page of matches, newest first, plus the total match count.
    async fn list_participants(
        &self,
        query: &ParticipantQuery,
    ) -> StoreResult<(Vec<Participant>, i64)>;

    /// Writes every mutable column of an existing participant.
    async fn save_participant(&self, participant: &Participant) -> StoreResult<Participant>;
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn insert_question(&self, new: NewQuestion) -> StoreResult<Question>;

    /// Participant-facing read. Never carries the answer key.
    async fn public_questions(&self, category: Category) -> StoreResult<Vec<PublicQuestion>>;

    /// Grading read, restricted to `category`.
    async fn answer_keys(&self, category: Category, ids: &[i64]) -> StoreResult<Vec<AnswerKey>>;
}

#[async_trait]
pub trait ExamSessionStore: Send + Sync {
    /// Fails with `Duplicate` when the participant already has a session.
    async fn create_session(
        &self,
        participant_id: i64,
        total_questions: i32,
    ) -> StoreResult<ExamSession>;

    async fn find_session(&self, participant_id: i64) -> StoreResult<Option<ExamSession>>;

    /// Moves an `in_progress` session to `completed`.
    /// Returns `None` when the session was not in progress.
    async fn complete_session(
        &self,
        participant_id: i64,
        score: i64,
        ended_at: DateTime<Utc>,
    ) -> StoreResult<Option<ExamSession>>;

    /// Appends to the violation log of an `in_progress` session and terminates it
    /// once `limit` incidents are reached. Returns `None` when not in progress.
    async fn record_violation(
        &self,
        participant_id: i64,
        violation: Violation,
        limit: Option<u32>,
    ) -> StoreResult<Option<ExamSession>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_audit_record(&self, record: NewAuditRecord) -> StoreResult<()>;

    /// Newest first.
    async fn list_audit_records(&self, limit: i64) -> StoreResult<Vec<AuditRecord>>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<Admin>>;

    async fn insert_admin(&self, username: &str, password_hash: &str) -> StoreResult<Admin>;
}

#[async_trait]
pub trait VerificationCodeStore: Send + Sync {
    /// Replaces any earlier code for the same address.
    async fn upsert_code(&self, email: &str, code: &str) -> StoreResult<()>;

    /// Issue time of the matching code, if any.
    async fn find_code(&self, email: &str, code: &str) -> StoreResult<Option<DateTime<Utc>>>;
}

pub trait Store:
    ParticipantStore
    + QuestionStore
    + ExamSessionStore
    + AuditStore
    + AdminStore
    + VerificationCodeStore
{
}

impl<T> Store for T where
    T: ParticipantStore
        + QuestionStore
        + ExamSessionStore
        + AuditStore
        + AdminStore
        + VerificationCodeStore
{
}

pub type DynStore = Arc<dyn Store>;
