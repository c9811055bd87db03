// src/models/question.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, SqlitePool};
use validator::Validate;

use crate::models::answer_option::{AnswerOption, PublicOption};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub quiz_id: i64,

    /// Sanitized HTML body of the question.
    pub text: String,

    /// Optional image path, relative to the media root (e.g. `questions/a1b2.png`).
    pub image: Option<String>,

    /// Display position within the quiz. Ties are broken by id.
    /// Mapped from the database column 'display_order' since `order` is a reserved SQL keyword.
    #[sqlx(rename = "display_order")]
    pub order: i64,

    pub created_at: DateTime<Utc>,
}

/// A question with its options in display order.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<AnswerOption>,
    /// First option flagged correct, in display order.
    pub correct_option_id: Option<i64>,
}

/// DTO for rendering a question to quiz takers (excludes correctness flags).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub image: Option<String>,
    pub options: Vec<PublicOption>,
}

impl Question {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All questions of a quiz with their options, both in display order.
    pub async fn list_for_quiz(
        pool: &SqlitePool,
        quiz_id: i64,
    ) -> Result<Vec<QuestionWithOptions>, sqlx::Error> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE quiz_id = ? ORDER BY display_order, id",
        )
        .bind(quiz_id)
        .fetch_all(pool)
        .await?;

        let options = sqlx::query_as::<_, AnswerOption>(
            r#"
            SELECT o.*
            FROM options o
            JOIN questions q ON o.question_id = q.id
            WHERE q.quiz_id = ?
            ORDER BY o.display_order, o.id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(pool)
        .await?;

        let mut by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for option in options {
            by_question.entry(option.question_id).or_default().push(option);
        }

        Ok(questions
            .into_iter()
            .map(|question| {
                let options = by_question.remove(&question.id).unwrap_or_default();
                QuestionWithOptions::new(question, options)
            })
            .collect())
    }
}

impl QuestionWithOptions {
    pub fn new(question: Question, options: Vec<AnswerOption>) -> Self {
        let correct_option_id = options.iter().find(|o| o.is_correct).map(|o| o.id);
        Self {
            question,
            options,
            correct_option_id,
        }
    }

    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.question.id,
            text: self.question.text.clone(),
            image: self.question.image.clone(),
            options: self.options.iter().map(PublicOption::from).collect(),
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    #[validate(range(min = 0))]
    pub order: Option<i64>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: Option<String>,
    #[validate(range(min = 0))]
    pub order: Option<i64>,
    /// Set to true to drop the current image reference.
    #[serde(default)]
    pub remove_image: bool,
}
