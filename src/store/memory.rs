// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{
    ADMIN_USERNAME_CONSTRAINT, AdminStore, AuditStore, ExamSessionStore, ParticipantStore,
    QuestionStore, REGISTRATION_ID_CONSTRAINT, SESSION_PARTICIPANT_CONSTRAINT, StoreError,
    StoreResult, VerificationCodeStore,
};
use crate::models::{
    admin::Admin,
    audit::{AuditRecord, NewAuditRecord},
    category::Category,
    exam_session::{ExamSession, SessionStatus, Violation},
    participant::{NewParticipant, Participant, ParticipantQuery},
    question::{AnswerKey, NewQuestion, PublicQuestion, Question},
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    /// Creation order; the last element is the newest.
    participants: Vec<Participant>,
    questions: Vec<Question>,
    sessions: HashMap<i64, ExamSession>,
    audit: Vec<AuditRecord>,
    admins: Vec<Admin>,
    codes: HashMap<String, (String, DateTime<Utc>)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store. Each call takes the table lock once, so a read followed
/// by an insert in the caller is not atomic, same as with the database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn latest_registration_id(&self) -> StoreResult<Option<String>> {
        let tables = self.tables.lock().await;
        Ok(tables.participants.last().map(|p| p.registration_id.clone()))
    }

    async fn insert_participant(&self, new: NewParticipant) -> StoreResult<Participant> {
        let mut tables = self.tables.lock().await;
        if tables
            .participants
            .iter()
            .any(|p| p.registration_id == new.registration_id)
        {
            return Err(StoreError::Duplicate {
                constraint: REGISTRATION_ID_CONSTRAINT.to_string(),
            });
        }

        let now = Utc::now();
        let participant = Participant {
            id: tables.next_id(),
            registration_id: new.registration_id,
            credential_hash: new.credential_hash,
            full_name: new.full_name,
            email: new.email,
            mobile: new.mobile,
            father_name: new.father_name,
            mother_name: new.mother_name,
            address: new.address,
            city: new.city,
            pincode: new.pincode,
            school_name: new.school_name,
            course_name: new.course_name,
            category: new.category,
            hard_copy: new.hard_copy,
            total_paid: new.total_paid,
            transaction_reference: new.transaction_reference,
            photo_reference: new.photo_reference,
            photo_uploaded: new.photo_uploaded,
            created_at: now,
            updated_at: now,
        };
        tables.participants.push(participant.clone());
        Ok(participant)
    }

    async fn find_participant_by_registration_id(
        &self,
        registration_id: &str,
    ) -> StoreResult<Option<Participant>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .participants
            .iter()
            .find(|p| p.registration_id == registration_id)
            .cloned())
    }

    async fn find_participant_by_id(&self, id: i64) -> StoreResult<Option<Participant>> {
        let tables = self.tables.lock().await;
        Ok(tables.participants.iter().find(|p| p.id == id).cloned())
    }

    async fn list_participants(
        &self,
        query: &ParticipantQuery,
    ) -> StoreResult<(Vec<Participant>, i64)> {
        let tables = self.tables.lock().await;
        let matches: Vec<&Participant> = tables
            .participants
            .iter()
            .rev()
            .filter(|p| query.matches(p))
            .collect();
        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn save_participant(&self, participant: &Participant) -> StoreResult<Participant> {
        let mut tables = self.tables.lock().await;
        let slot = tables
            .participants
            .iter_mut()
            .find(|p| p.id == participant.id)
            .ok_or_else(|| StoreError::Database(format!("participant {} not found", participant.id)))?;

        // registration id and creation time are never rewritten
        let mut updated = participant.clone();
        updated.registration_id = slot.registration_id.clone();
        updated.created_at = slot.created_at;
        updated.updated_at = Utc::now();
        *slot = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn insert_question(&self, new: NewQuestion) -> StoreResult<Question> {
        let mut tables = self.tables.lock().await;
        let question = Question {
            id: tables.next_id(),
            category: new.category,
            text: new.text,
            options: new.options,
            correct_option: new.correct_option,
            marks: new.marks,
            created_at: Utc::now(),
        };
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn public_questions(&self, category: Category) -> StoreResult<Vec<PublicQuestion>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.category == category)
            .cloned()
            .map(PublicQuestion::from)
            .collect())
    }

    async fn answer_keys(&self, category: Category, ids: &[i64]) -> StoreResult<Vec<AnswerKey>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.category == category && ids.contains(&q.id))
            .map(|q| AnswerKey {
                id: q.id,
                correct_option: q.correct_option.clone(),
                marks: q.marks,
            })
            .collect())
    }
}

#[async_trait]
impl ExamSessionStore for MemoryStore {
    async fn create_session(
        &self,
        participant_id: i64,
        total_questions: i32,
    ) -> StoreResult<ExamSession> {
        let mut tables = self.tables.lock().await;
        if tables.sessions.contains_key(&participant_id) {
            return Err(StoreError::Duplicate {
                constraint: SESSION_PARTICIPANT_CONSTRAINT.to_string(),
            });
        }
        let session = ExamSession {
            id: tables.next_id(),
            participant_id,
            status: SessionStatus::InProgress,
            score: 0,
            total_questions,
            start_time: Utc::now(),
            end_time: None,
            warning_count: 0,
            violation_log: Vec::new(),
        };
        tables.sessions.insert(participant_id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, participant_id: i64) -> StoreResult<Option<ExamSession>> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.get(&participant_id).cloned())
    }

    async fn complete_session(
        &self,
        participant_id: i64,
        score: i64,
        ended_at: DateTime<Utc>,
    ) -> StoreResult<Option<ExamSession>> {
        let mut tables = self.tables.lock().await;
        match tables.sessions.get_mut(&participant_id) {
            Some(session) if session.status == SessionStatus::InProgress => {
                session.status = SessionStatus::Completed;
                session.score = score;
                session.end_time = Some(ended_at);
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn record_violation(
        &self,
        participant_id: i64,
        violation: Violation,
        limit: Option<u32>,
    ) -> StoreResult<Option<ExamSession>> {
        let mut tables = self.tables.lock().await;
        match tables.sessions.get_mut(&participant_id) {
            Some(session) if session.status == SessionStatus::InProgress => {
                session.violation_log.push(violation);
                session.warning_count += 1;
                if limit.is_some_and(|l| session.warning_count as u32 >= l) {
                    session.status = SessionStatus::Terminated;
                    session.end_time = Some(Utc::now());
                }
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert_audit_record(&self, record: NewAuditRecord) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.audit.push(AuditRecord {
            id,
            admin_id: record.admin_id,
            admin_name: None,
            action: record.action,
            target_registration_id: record.target_registration_id,
            details: record.details,
            ip_address: record.ip_address,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_audit_records(&self, limit: i64) -> StoreResult<Vec<AuditRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .audit
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .map(|r| {
                let mut r = r.clone();
                r.admin_name = tables
                    .admins
                    .iter()
                    .find(|a| a.id == r.admin_id)
                    .map(|a| a.username.clone());
                r
            })
            .collect())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<Admin>> {
        let tables = self.tables.lock().await;
        Ok(tables.admins.iter().find(|a| a.username == username).cloned())
    }

    async fn insert_admin(&self, username: &str, password_hash: &str) -> StoreResult<Admin> {
        let mut tables = self.tables.lock().await;
        if tables.admins.iter().any(|a| a.username == username) {
            return Err(StoreError::Duplicate {
                constraint: ADMIN_USERNAME_CONSTRAINT.to_string(),
            });
        }
        let admin = Admin {
            id: tables.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }
}

#[async_trait]
impl VerificationCodeStore for MemoryStore {
    async fn upsert_code(&self, email: &str, code: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .codes
            .insert(email.to_lowercase(), (code.to_string(), Utc::now()));
        Ok(())
    }

    async fn find_code(&self, email: &str, code: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .codes
            .get(&email.to_lowercase())
            .filter(|(stored, _)| stored == code)
            .map(|(_, issued_at)| *issued_at))
    }
}
