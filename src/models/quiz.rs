// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::models::question::QuestionWithOptions;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    /// Sanitized HTML, safe to render as-is.
    pub description: String,
    /// Time limit in minutes, between 1 and 525 600 (one year).
    pub time_limit: i64,
    pub language: String,
    /// Inactive quizzes are hidden from quiz takers but stay editable.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quiz row joined with its question count, used by list pages.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub time_limit: i64,
    pub language: String,
    pub is_active: bool,
    pub total_questions: i64,
    pub created_at: DateTime<Utc>,
}

/// Full quiz tree returned to administrators.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithOptions>,
}

const SUMMARY_SELECT: &str = r#"
    SELECT
        q.id, q.title, q.description, q.time_limit, q.language, q.is_active, q.created_at,
        (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS total_questions
    FROM quizzes q
"#;

impl Quiz {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Quiz>, sqlx::Error> {
        sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Looks up a quiz visible to quiz takers.
    pub async fn find_active(pool: &SqlitePool, id: i64) -> Result<Option<Quiz>, sqlx::Error> {
        sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ? AND is_active = TRUE")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_questions(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE quiz_id = ?")
            .bind(self.id)
            .fetch_one(pool)
            .await
    }
}

impl QuizSummary {
    /// Newest first, active quizzes only.
    pub async fn list_active(pool: &SqlitePool) -> Result<Vec<QuizSummary>, sqlx::Error> {
        let sql = format!("{SUMMARY_SELECT} WHERE q.is_active = TRUE ORDER BY q.created_at DESC, q.id DESC");
        sqlx::query_as::<_, QuizSummary>(&sql).fetch_all(pool).await
    }

    /// Admin listing. Both filters are optional; `q` is a substring of the
    /// title or description (ASCII case-insensitive, as SQLite `LIKE`).
    pub async fn search(pool: &SqlitePool, filter: &QuizFilter) -> Result<Vec<QuizSummary>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SUMMARY_SELECT);
        builder.push(" WHERE 1 = 1");

        if let Some(active) = filter.active {
            builder.push(" AND q.is_active = ").push_bind(active);
        }

        if let Some(term) = filter.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(term));
            builder
                .push(" AND (q.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR q.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        builder.push(" ORDER BY q.created_at DESC, q.id DESC");
        builder.build_query_as::<QuizSummary>().fetch_all(pool).await
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Query string of the admin quiz listing.
#[derive(Debug, Default, Deserialize)]
pub struct QuizFilter {
    pub active: Option<bool>,
    pub q: Option<String>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 characters."))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, max = 525_600, message = "Time limit must be between 1 minute and 1 year."))]
    pub time_limit: i64,
    #[validate(length(min = 1, max = 50))]
    pub language: Option<String>,
    pub is_active: Option<bool>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 characters."))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 525_600, message = "Time limit must be between 1 minute and 1 year."))]
    pub time_limit: Option<i64>,
    #[validate(length(min = 1, max = 50))]
    pub language: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateQuizRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.time_limit.is_none()
            && self.language.is_none()
            && self.is_active.is_none()
    }
}
