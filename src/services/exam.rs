// src/services/exam.rs

//! One exam attempt per participant: `in_progress` -> `completed` on submit,
//! or -> `terminated` once the violation limit is reached.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::{
    error::AppError,
    models::{
        exam_session::{
            SessionStatus, StartExamResponse, SubmitExamResponse, Violation, ViolationRequest,
            ViolationResponse,
        },
        participant::Participant,
        question::AnswerKey,
    },
    store::{ExamSessionStore, ParticipantStore, QuestionStore, StoreError},
};

#[derive(Debug, Error)]
pub enum ExamError {
    #[error("Exam already attempted")]
    AlreadyAttempted,

    #[error("No questions available for your category")]
    NoQuestionsForCategory,

    #[error("No exam session found")]
    NoSession,

    #[error("Exam already submitted")]
    AlreadySubmitted,

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ExamError> for AppError {
    fn from(err: ExamError) -> Self {
        match err {
            ExamError::AlreadyAttempted | ExamError::AlreadySubmitted => {
                AppError::Conflict(err.to_string())
            }
            ExamError::NoQuestionsForCategory
            | ExamError::NoSession
            | ExamError::ParticipantNotFound => AppError::NotFound(err.to_string()),
            ExamError::Store(e) => e.into(),
        }
    }
}

/// Sum of marks over answered questions whose chosen option matches the key.
/// Answers to questions missing from `keys` earn nothing.
pub fn score(answers: &HashMap<i64, String>, keys: &[AnswerKey]) -> i64 {
    keys.iter()
        .filter(|key| {
            answers
                .get(&key.id)
                .is_some_and(|chosen| chosen.trim() == key.correct_option)
        })
        .map(|key| i64::from(key.marks))
        .sum()
}

/// Keeps the entries keyed by a numeric question id with a string option.
pub fn parse_answers(raw: &HashMap<String, Value>) -> HashMap<i64, String> {
    raw.iter()
        .filter_map(|(id, chosen)| {
            let id = id.trim().parse::<i64>().ok()?;
            Some((id, chosen.as_str()?.to_string()))
        })
        .collect()
}

async fn load_participant<S>(store: &S, participant_id: i64) -> Result<Participant, ExamError>
where
    S: ParticipantStore + ?Sized,
{
    store
        .find_participant_by_id(participant_id)
        .await?
        .ok_or(ExamError::ParticipantNotFound)
}

/// Opens the participant's only session and hands out the question pool of
/// their category, without answer keys.
pub async fn start_exam<S>(store: &S, participant_id: i64) -> Result<StartExamResponse, ExamError>
where
    S: ParticipantStore + QuestionStore + ExamSessionStore + ?Sized,
{
    let participant = load_participant(store, participant_id).await?;

    if store.find_session(participant_id).await?.is_some() {
        return Err(ExamError::AlreadyAttempted);
    }

    let questions = store.public_questions(participant.category).await?;
    if questions.is_empty() {
        return Err(ExamError::NoQuestionsForCategory);
    }

    let session = match store
        .create_session(participant_id, questions.len() as i32)
        .await
    {
        Ok(session) => session,
        // lost a race against a parallel start
        Err(e) if e.is_duplicate() => return Err(ExamError::AlreadyAttempted),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        participant_id,
        session_id = session.id,
        category = %participant.category,
        "Exam session started"
    );

    Ok(StartExamResponse {
        session_id: session.id,
        status: session.status,
        start_time: session.start_time,
        total_questions: questions.len(),
        questions,
    })
}

/// Grades against the participant's own category and closes the session.
pub async fn submit_exam<S>(
    store: &S,
    participant_id: i64,
    raw_answers: &HashMap<String, Value>,
) -> Result<SubmitExamResponse, ExamError>
where
    S: ParticipantStore + QuestionStore + ExamSessionStore + ?Sized,
{
    let session = store
        .find_session(participant_id)
        .await?
        .ok_or(ExamError::NoSession)?;
    if session.status != SessionStatus::InProgress {
        return Err(ExamError::AlreadySubmitted);
    }

    let participant = load_participant(store, participant_id).await?;
    let answers = parse_answers(raw_answers);
    let ids: Vec<i64> = answers.keys().copied().collect();
    let keys = store.answer_keys(participant.category, &ids).await?;
    let total = score(&answers, &keys);

    let completed = store
        .complete_session(participant_id, total, Utc::now())
        .await?
        .ok_or(ExamError::AlreadySubmitted)?;

    tracing::info!(participant_id, score = total, "Exam submitted");

    Ok(SubmitExamResponse {
        score: completed.score,
        status: completed.status,
        end_time: completed.end_time.unwrap_or_else(Utc::now),
        message: "Exam submitted successfully".to_string(),
    })
}

/// Appends a proctoring incident. With a `limit`, the session is terminated
/// once that many incidents have been recorded.
pub async fn record_violation<S>(
    store: &S,
    participant_id: i64,
    report: ViolationRequest,
    limit: Option<u32>,
) -> Result<ViolationResponse, ExamError>
where
    S: ExamSessionStore + ?Sized,
{
    let session = store
        .find_session(participant_id)
        .await?
        .ok_or(ExamError::NoSession)?;
    if session.status != SessionStatus::InProgress {
        return Err(ExamError::AlreadySubmitted);
    }

    let violation = Violation {
        kind: report.kind,
        timestamp: Utc::now(),
        details: report.details,
    };
    let updated = store
        .record_violation(participant_id, violation, limit)
        .await?
        .ok_or(ExamError::AlreadySubmitted)?;

    tracing::warn!(
        participant_id,
        warning_count = updated.warning_count,
        status = %updated.status,
        "Exam violation recorded"
    );

    Ok(ViolationResponse {
        warning_count: updated.warning_count,
        status: updated.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            category::Category,
            participant::NewParticipant,
            question::{NewQuestion, QuestionOption},
        },
        store::MemoryStore,
    };

    fn key(id: i64, correct: &str, marks: i32) -> AnswerKey {
        AnswerKey {
            id,
            correct_option: correct.to_string(),
            marks,
        }
    }

    #[test]
    fn test_calculate_score_partial() {
        let keys = vec![key(1, "a", 1), key(2, "b", 1), key(3, "c", 1)];
        let answers = HashMap::from([
            (1, "a".to_string()),
            (2, "b".to_string()),
            (3, "d".to_string()),
        ]);
        assert_eq!(score(&answers, &keys), 2);
    }

    #[test]
    fn test_calculate_score_weighted_and_unknown() {
        let keys = vec![key(1, "a", 4), key(2, "b", 2)];
        let answers = HashMap::from([
            (1, "a".to_string()),
            (2, "a".to_string()),
            (99, "a".to_string()),
        ]);
        assert_eq!(score(&answers, &keys), 4);
    }

    #[test]
    fn test_calculate_score_empty() {
        assert_eq!(score(&HashMap::new(), &[key(1, "a", 1)]), 0);
    }

    #[test]
    fn malformed_answer_entries_are_dropped() {
        let raw = HashMap::from([
            ("7".to_string(), Value::from("b")),
            (" 8 ".to_string(), Value::from("a")),
            ("not-a-question".to_string(), Value::from("a")),
            ("9".to_string(), Value::from(2)),
            ("10".to_string(), Value::Null),
        ]);
        let parsed = parse_answers(&raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[&7], "b");
        assert_eq!(parsed[&8], "a");
    }

    async fn seeded(category: Category) -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let participant = store
            .insert_participant(NewParticipant {
                registration_id: "NFLO26-1001".to_string(),
                credential_hash: "hash".to_string(),
                full_name: "Test".to_string(),
                email: "t@example.com".to_string(),
                mobile: "9000000000".to_string(),
                father_name: "F".to_string(),
                mother_name: "M".to_string(),
                address: "A".to_string(),
                city: "C".to_string(),
                pincode: "000000".to_string(),
                school_name: None,
                course_name: "Standard".to_string(),
                category,
                hard_copy: false,
                total_paid: 300,
                transaction_reference: None,
                photo_reference: "p.jpg".to_string(),
                photo_uploaded: true,
            })
            .await
            .unwrap();
        (store, participant.id)
    }

    async fn add_question(store: &MemoryStore, category: Category) -> i64 {
        store
            .insert_question(NewQuestion {
                category,
                text: "2 + 2?".to_string(),
                options: vec![
                    QuestionOption {
                        id: "a".to_string(),
                        text: "4".to_string(),
                    },
                    QuestionOption {
                        id: "b".to_string(),
                        text: "5".to_string(),
                    },
                ],
                correct_option: "a".to_string(),
                marks: 1,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let (store, pid) = seeded(Category::Junior).await;
        add_question(&store, Category::Junior).await;

        let started = start_exam(&store, pid).await.unwrap();
        assert_eq!(started.total_questions, 1);
        assert!(matches!(
            start_exam(&store, pid).await,
            Err(ExamError::AlreadyAttempted)
        ));
    }

    #[tokio::test]
    async fn parallel_starts_create_one_session() {
        let (store, pid) = seeded(Category::Junior).await;
        add_question(&store, Category::Junior).await;
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { start_exam(&*store, pid).await })
            })
            .collect();

        let mut started = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => started += 1,
                Err(ExamError::AlreadyAttempted) => {}
                Err(e) => panic!("unexpected start error: {e}"),
            }
        }
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn restart_is_rejected_once_session_has_ended() {
        let (store, pid) = seeded(Category::Junior).await;
        add_question(&store, Category::Junior).await;
        start_exam(&store, pid).await.unwrap();
        submit_exam(&store, pid, &HashMap::new()).await.unwrap();

        assert!(matches!(
            start_exam(&store, pid).await,
            Err(ExamError::AlreadyAttempted)
        ));
    }

    #[tokio::test]
    async fn empty_pool_creates_no_session() {
        let (store, pid) = seeded(Category::Junior).await;
        add_question(&store, Category::Senior).await;

        assert!(matches!(
            start_exam(&store, pid).await,
            Err(ExamError::NoQuestionsForCategory)
        ));
        assert!(store.find_session(pid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_category_answers_do_not_count() {
        let (store, pid) = seeded(Category::Junior).await;
        let own = add_question(&store, Category::Junior).await;
        let foreign = add_question(&store, Category::Senior).await;
        start_exam(&store, pid).await.unwrap();

        let answers = HashMap::from([
            (own.to_string(), Value::from("a")),
            (foreign.to_string(), Value::from("a")),
        ]);
        let result = submit_exam(&store, pid, &answers).await.unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.status, SessionStatus::Completed);

        assert!(matches!(
            submit_exam(&store, pid, &answers).await,
            Err(ExamError::AlreadySubmitted)
        ));
    }

    #[tokio::test]
    async fn junk_answers_score_zero_alongside_valid_ones() {
        let (store, pid) = seeded(Category::Junior).await;
        let q = add_question(&store, Category::Junior).await;
        start_exam(&store, pid).await.unwrap();

        let answers = HashMap::from([
            (q.to_string(), Value::from("a")),
            ("not-a-question".to_string(), Value::from("a")),
            ("123456".to_string(), Value::from("a")),
            ("77".to_string(), serde_json::json!({"option": "a"})),
        ]);
        let result = submit_exam(&store, pid, &answers).await.unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn submit_without_session_is_not_found() {
        let (store, pid) = seeded(Category::Junior).await;
        assert!(matches!(
            submit_exam(&store, pid, &HashMap::new()).await,
            Err(ExamError::NoSession)
        ));
    }

    #[tokio::test]
    async fn violations_terminate_at_limit() {
        let (store, pid) = seeded(Category::Junior).await;
        add_question(&store, Category::Junior).await;
        start_exam(&store, pid).await.unwrap();

        let report = || ViolationRequest {
            kind: "tab_switch".to_string(),
            details: None,
        };
        let first = record_violation(&store, pid, report(), Some(2)).await.unwrap();
        assert_eq!(first.warning_count, 1);
        assert_eq!(first.status, SessionStatus::InProgress);

        let second = record_violation(&store, pid, report(), Some(2)).await.unwrap();
        assert_eq!(second.status, SessionStatus::Terminated);

        assert!(matches!(
            submit_exam(&store, pid, &HashMap::new()).await,
            Err(ExamError::AlreadySubmitted)
        ));
        assert!(matches!(
            start_exam(&store, pid).await,
            Err(ExamError::AlreadyAttempted)
        ));
    }
}
