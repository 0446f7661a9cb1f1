// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use super::{
    AdminStore, AuditStore, ExamSessionStore, ParticipantStore, QuestionStore, StoreError,
    StoreResult, VerificationCodeStore,
};
use crate::models::{
    admin::Admin,
    audit::{AuditAction, AuditRecord, NewAuditRecord},
    category::Category,
    exam_session::{ExamSession, SessionStatus, Violation},
    participant::{NewParticipant, Participant, ParticipantQuery},
    question::{AnswerKey, NewQuestion, PublicQuestion, Question, QuestionOption},
};

const PARTICIPANT_COLUMNS: &str = r#"
    id, registration_id, credential_hash, full_name, email, mobile,
    father_name, mother_name, address, city, pincode, school_name, course_name,
    category, hard_copy, total_paid, transaction_reference,
    photo_reference, photo_uploaded, created_at, updated_at
"#;

const SESSION_COLUMNS: &str = r#"
    id, participant_id, status, score, total_questions,
    start_time, end_time, warning_count, violation_log
"#;

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_category(raw: &str) -> StoreResult<Category> {
    raw.parse().map_err(StoreError::Corrupt)
}

#[derive(FromRow)]
struct ParticipantRow {
    id: i64,
    registration_id: String,
    credential_hash: String,
    full_name: String,
    email: String,
    mobile: String,
    father_name: String,
    mother_name: String,
    address: String,
    city: String,
    pincode: String,
    school_name: Option<String>,
    course_name: String,
    category: String,
    hard_copy: bool,
    total_paid: i64,
    transaction_reference: Option<String>,
    photo_reference: String,
    photo_uploaded: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ParticipantRow {
    fn into_participant(self) -> StoreResult<Participant> {
        Ok(Participant {
            id: self.id,
            registration_id: self.registration_id,
            credential_hash: self.credential_hash,
            full_name: self.full_name,
            email: self.email,
            mobile: self.mobile,
            father_name: self.father_name,
            mother_name: self.mother_name,
            address: self.address,
            city: self.city,
            pincode: self.pincode,
            school_name: self.school_name,
            course_name: self.course_name,
            category: parse_category(&self.category)?,
            hard_copy: self.hard_copy,
            total_paid: self.total_paid,
            transaction_reference: self.transaction_reference,
            photo_reference: self.photo_reference,
            photo_uploaded: self.photo_uploaded,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    category: String,
    text: String,
    options: Json<Vec<QuestionOption>>,
    correct_option: String,
    marks: i32,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PublicQuestionRow {
    id: i64,
    category: String,
    text: String,
    options: Json<Vec<QuestionOption>>,
    marks: i32,
}

#[derive(FromRow)]
struct AnswerKeyRow {
    id: i64,
    correct_option: String,
    marks: i32,
}

#[derive(FromRow)]
struct SessionRow {
    id: i64,
    participant_id: i64,
    status: String,
    score: i64,
    total_questions: i32,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    warning_count: i32,
    violation_log: Json<Vec<Violation>>,
}

impl SessionRow {
    fn into_session(self) -> StoreResult<ExamSession> {
        Ok(ExamSession {
            id: self.id,
            participant_id: self.participant_id,
            status: self
                .status
                .parse::<SessionStatus>()
                .map_err(StoreError::Corrupt)?,
            score: self.score,
            total_questions: self.total_questions,
            start_time: self.start_time,
            end_time: self.end_time,
            warning_count: self.warning_count,
            violation_log: self.violation_log.0,
        })
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: i64,
    admin_id: i64,
    admin_name: Option<String>,
    action: String,
    target_registration_id: Option<String>,
    details: serde_json::Value,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    password: String,
    created_at: DateTime<Utc>,
}

impl From<AdminRow> for Admin {
    fn from(r: AdminRow) -> Self {
        Admin {
            id: r.id,
            username: r.username,
            password: r.password,
            created_at: r.created_at,
        }
    }
}

/// Appends the WHERE clause for a participant listing.
fn push_participant_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ParticipantQuery) {
    builder.push(" WHERE TRUE");

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = ParticipantQuery::like_pattern(term);
        builder.push(" AND (");
        let mut or = builder.separated(" OR ");
        for column in [
            "full_name",
            "school_name",
            "email",
            "mobile",
            "registration_id",
            "father_name",
            "mother_name",
            "city",
            "pincode",
            "transaction_reference",
        ] {
            or.push(format!("{} ILIKE ", column));
            or.push_bind_unseparated(pattern.clone());
        }
        builder.push(")");
    }

    if let Some(category) = query.category {
        builder.push(" AND category = ");
        builder.push_bind(category.as_str());
    }

    if let Some(city) = query.city.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND city ILIKE ");
        builder.push_bind(ParticipantQuery::like_pattern(city));
    }

    if let Some(hard_copy) = query.hard_copy {
        builder.push(" AND hard_copy = ");
        builder.push_bind(hard_copy);
    }

    if query.pending_photo {
        builder.push(" AND photo_uploaded = FALSE");
    }
}

#[async_trait]
impl ParticipantStore for PgStore {
    async fn latest_registration_id(&self) -> StoreResult<Option<String>> {
        let id = sqlx::query_scalar::<_, String>(
            "SELECT registration_id FROM participants ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_participant(&self, new: NewParticipant) -> StoreResult<Participant> {
        let sql = format!(
            r#"
            INSERT INTO participants (
                registration_id, credential_hash, full_name, email, mobile,
                father_name, mother_name, address, city, pincode, school_name, course_name,
                category, hard_copy, total_paid, transaction_reference,
                photo_reference, photo_uploaded
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            PARTICIPANT_COLUMNS
        );

        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(&new.registration_id)
            .bind(&new.credential_hash)
            .bind(&new.full_name)
            .bind(&new.email)
            .bind(&new.mobile)
            .bind(&new.father_name)
            .bind(&new.mother_name)
            .bind(&new.address)
            .bind(&new.city)
            .bind(&new.pincode)
            .bind(&new.school_name)
            .bind(&new.course_name)
            .bind(new.category.as_str())
            .bind(new.hard_copy)
            .bind(new.total_paid)
            .bind(&new.transaction_reference)
            .bind(&new.photo_reference)
            .bind(new.photo_uploaded)
            .fetch_one(&self.pool)
            .await?;

        row.into_participant()
    }

    async fn find_participant_by_registration_id(
        &self,
        registration_id: &str,
    ) -> StoreResult<Option<Participant>> {
        let sql = format!(
            "SELECT {} FROM participants WHERE registration_id = $1",
            PARTICIPANT_COLUMNS
        );
        sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(registration_id)
            .fetch_optional(&self.pool)
            .await?
            .map(ParticipantRow::into_participant)
            .transpose()
    }

    async fn find_participant_by_id(&self, id: i64) -> StoreResult<Option<Participant>> {
        let sql = format!("SELECT {} FROM participants WHERE id = $1", PARTICIPANT_COLUMNS);
        sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ParticipantRow::into_participant)
            .transpose()
    }

    async fn list_participants(
        &self,
        query: &ParticipantQuery,
    ) -> StoreResult<(Vec<Participant>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM participants");
        push_participant_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM participants", PARTICIPANT_COLUMNS));
        push_participant_filters(&mut select, query);
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(query.limit());
        select.push(" OFFSET ");
        select.push_bind(query.offset());

        let rows: Vec<ParticipantRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let participants = rows
            .into_iter()
            .map(ParticipantRow::into_participant)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((participants, total))
    }

    async fn save_participant(&self, p: &Participant) -> StoreResult<Participant> {
        let sql = format!(
            r#"
            UPDATE participants SET
                credential_hash = $2, full_name = $3, email = $4, mobile = $5,
                father_name = $6, mother_name = $7, address = $8, city = $9, pincode = $10,
                school_name = $11, course_name = $12, category = $13, hard_copy = $14,
                total_paid = $15, transaction_reference = $16,
                photo_reference = $17, photo_uploaded = $18,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PARTICIPANT_COLUMNS
        );

        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(p.id)
            .bind(&p.credential_hash)
            .bind(&p.full_name)
            .bind(&p.email)
            .bind(&p.mobile)
            .bind(&p.father_name)
            .bind(&p.mother_name)
            .bind(&p.address)
            .bind(&p.city)
            .bind(&p.pincode)
            .bind(&p.school_name)
            .bind(&p.course_name)
            .bind(p.category.as_str())
            .bind(p.hard_copy)
            .bind(p.total_paid)
            .bind(&p.transaction_reference)
            .bind(&p.photo_reference)
            .bind(p.photo_uploaded)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::Database(format!("participant {} not found", p.id)))?;

        row.into_participant()
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn insert_question(&self, new: NewQuestion) -> StoreResult<Question> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            INSERT INTO questions (category, text, options, correct_option, marks)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, category, text, options, correct_option, marks, created_at
            "#,
        )
        .bind(new.category.as_str())
        .bind(&new.text)
        .bind(Json(&new.options))
        .bind(&new.correct_option)
        .bind(new.marks)
        .fetch_one(&self.pool)
        .await?;

        Ok(Question {
            id: row.id,
            category: parse_category(&row.category)?,
            text: row.text,
            options: row.options.0,
            correct_option: row.correct_option,
            marks: row.marks,
            created_at: row.created_at,
        })
    }

    async fn public_questions(&self, category: Category) -> StoreResult<Vec<PublicQuestion>> {
        // correct_option is deliberately not selected here
        let rows = sqlx::query_as::<_, PublicQuestionRow>(
            r#"
            SELECT id, category, text, options, marks
            FROM questions
            WHERE category = $1
            ORDER BY id
            "#,
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(PublicQuestion {
                    id: r.id,
                    category: parse_category(&r.category)?,
                    text: r.text,
                    options: r.options.0,
                    marks: r.marks,
                })
            })
            .collect()
    }

    async fn answer_keys(&self, category: Category, ids: &[i64]) -> StoreResult<Vec<AnswerKey>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, AnswerKeyRow>(
            r#"
            SELECT id, correct_option, marks
            FROM questions
            WHERE category = $1 AND id = ANY($2)
            "#,
        )
        .bind(category.as_str())
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| AnswerKey {
                id: r.id,
                correct_option: r.correct_option,
                marks: r.marks,
            })
            .collect())
    }
}

#[async_trait]
impl ExamSessionStore for PgStore {
    async fn create_session(
        &self,
        participant_id: i64,
        total_questions: i32,
    ) -> StoreResult<ExamSession> {
        let sql = format!(
            r#"
            INSERT INTO exam_sessions (participant_id, total_questions)
            VALUES ($1, $2)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(participant_id)
            .bind(total_questions)
            .fetch_one(&self.pool)
            .await?
            .into_session()
    }

    async fn find_session(&self, participant_id: i64) -> StoreResult<Option<ExamSession>> {
        let sql = format!(
            "SELECT {} FROM exam_sessions WHERE participant_id = $1",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(participant_id)
            .fetch_optional(&self.pool)
            .await?
            .map(SessionRow::into_session)
            .transpose()
    }

    async fn complete_session(
        &self,
        participant_id: i64,
        score: i64,
        ended_at: DateTime<Utc>,
    ) -> StoreResult<Option<ExamSession>> {
        let sql = format!(
            r#"
            UPDATE exam_sessions
            SET status = 'completed', score = $2, end_time = $3
            WHERE participant_id = $1 AND status = 'in_progress'
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(participant_id)
            .bind(score)
            .bind(ended_at)
            .fetch_optional(&self.pool)
            .await?
            .map(SessionRow::into_session)
            .transpose()
    }

    async fn record_violation(
        &self,
        participant_id: i64,
        violation: Violation,
        limit: Option<u32>,
    ) -> StoreResult<Option<ExamSession>> {
        let limit = limit.map(|l| l as i32);
        let sql = format!(
            r#"
            UPDATE exam_sessions SET
                violation_log = violation_log || $2,
                warning_count = warning_count + 1,
                status = CASE
                    WHEN $3::INT IS NOT NULL AND warning_count + 1 >= $3 THEN 'terminated'
                    ELSE status
                END,
                end_time = CASE
                    WHEN $3::INT IS NOT NULL AND warning_count + 1 >= $3 THEN NOW()
                    ELSE end_time
                END
            WHERE participant_id = $1 AND status = 'in_progress'
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(participant_id)
            .bind(Json(vec![violation]))
            .bind(limit)
            .fetch_optional(&self.pool)
            .await?
            .map(SessionRow::into_session)
            .transpose()
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn insert_audit_record(&self, record: NewAuditRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (admin_id, action, target_registration_id, details, ip_address)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.admin_id)
        .bind(record.action.as_str())
        .bind(&record.target_registration_id)
        .bind(&record.details)
        .bind(&record.ip_address)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_audit_records(&self, limit: i64) -> StoreResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT
                l.id, l.admin_id, a.username AS admin_name, l.action,
                l.target_registration_id, l.details, l.ip_address, l.created_at
            FROM audit_logs l
            LEFT JOIN admins a ON a.id = l.admin_id
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(AuditRecord {
                    id: r.id,
                    admin_id: r.admin_id,
                    admin_name: r.admin_name,
                    action: r.action.parse::<AuditAction>().map_err(StoreError::Corrupt)?,
                    target_registration_id: r.target_registration_id,
                    details: r.details,
                    ip_address: r.ip_address,
                    created_at: r.created_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<Admin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, username, password, created_at FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Admin::from))
    }

    async fn insert_admin(&self, username: &str, password_hash: &str) -> StoreResult<Admin> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            INSERT INTO admins (username, password)
            VALUES ($1, $2)
            RETURNING id, username, password, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl VerificationCodeStore for PgStore {
    async fn upsert_code(&self, email: &str, code: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_codes (email, code, created_at)
            VALUES (LOWER($1), $2, NOW())
            ON CONFLICT (email) DO UPDATE SET code = EXCLUDED.code, created_at = NOW()
            "#,
        )
        .bind(email)
        .bind(code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_code(&self, email: &str, code: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let issued_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM verification_codes WHERE email = LOWER($1) AND code = $2",
        )
        .bind(email)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(issued_at)
    }
}
