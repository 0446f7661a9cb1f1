// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::category::Category;

/// A selectable answer. `id` is what participants submit back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

/// Full question record, including the answer key.
/// Only ever returned to administrators; participants get `PublicQuestion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub category: Category,
    pub text: String,
    pub options: Vec<QuestionOption>,
    pub correct_option: String,
    pub marks: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending question to client (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub category: Category,
    pub text: String,
    pub options: Vec<QuestionOption>,
    pub marks: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            category: q.category,
            text: q.text,
            options: q.options,
            marks: q.marks,
        }
    }
}

/// Grading projection: just what scoring needs.
#[derive(Debug, Clone)]
pub struct AnswerKey {
    pub id: i64,
    pub correct_option: String,
    pub marks: i32,
}

/// Insert payload for the store.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub category: Category,
    pub text: String,
    pub options: Vec<QuestionOption>,
    pub correct_option: String,
    pub marks: i32,
}

fn default_marks() -> i32 {
    1
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_answer_key))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<QuestionOption>,
    #[validate(length(min = 1, max = 50))]
    pub correct_option: String,
    pub category: Category,
    #[serde(default = "default_marks")]
    #[validate(range(min = 1, max = 100))]
    pub marks: i32,
}

fn validate_options(options: &[QuestionOption]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    let mut seen = HashSet::new();
    for opt in options {
        if opt.id.trim().is_empty() || opt.id.len() > 50 {
            return Err(validator::ValidationError::new("invalid_option_id"));
        }
        if opt.text.trim().is_empty() || opt.text.len() > 500 {
            return Err(validator::ValidationError::new("invalid_option_text"));
        }
        if !seen.insert(opt.id.as_str()) {
            return Err(validator::ValidationError::new("duplicate_option_id"));
        }
    }
    Ok(())
}

/// The key must name one of the offered options.
fn validate_answer_key(req: &CreateQuestionRequest) -> Result<(), validator::ValidationError> {
    if req.options.iter().any(|o| o.id == req.correct_option) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("correct_option_not_in_options"))
    }
}
