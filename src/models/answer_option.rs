// src/models/answer_option.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

/// Represents the 'options' table: one answer choice of a question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
    #[sqlx(rename = "display_order")]
    pub order: i64,
}

/// DTO for showing an option to quiz takers.
#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

impl From<&AnswerOption> for PublicOption {
    fn from(option: &AnswerOption) -> Self {
        Self {
            id: option.id,
            text: option.text.clone(),
        }
    }
}

impl AnswerOption {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<AnswerOption>, sqlx::Error> {
        sqlx::query_as::<_, AnswerOption>("SELECT * FROM options WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// DTO for creating a new option.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[validate(range(min = 0))]
    pub order: Option<i64>,
}

/// DTO for updating an option. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: Option<String>,
    pub is_correct: Option<bool>,
    #[validate(range(min = 0))]
    pub order: Option<i64>,
}

impl UpdateOptionRequest {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.is_correct.is_none() && self.order.is_none()
    }
}
