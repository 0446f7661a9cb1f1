// src/models/exam_session.rs

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::question::PublicQuestion;

/// `in_progress` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Terminated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "terminated" => Ok(SessionStatus::Terminated),
            other => Err(format!("Unknown session status '{}'", other)),
        }
    }
}

/// One proctoring incident reported by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

/// The single exam attempt of one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: i64,
    pub participant_id: i64,
    pub status: SessionStatus,
    pub score: i64,
    pub total_questions: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub warning_count: i32,
    pub violation_log: Vec<Violation>,
}

/// DTO for returning a started exam.
#[derive(Debug, Serialize)]
pub struct StartExamResponse {
    pub session_id: i64,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub total_questions: usize,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// Question id -> chosen option id. Kept loose so that unknown or
    /// malformed entries score zero instead of rejecting the submission.
    pub answers: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmitExamResponse {
    pub score: i64,
    pub status: SessionStatus,
    pub end_time: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ViolationRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub kind: String,
    #[validate(length(max = 500))]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViolationResponse {
    pub warning_count: i32,
    pub status: SessionStatus,
}
