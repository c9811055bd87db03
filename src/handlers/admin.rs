// src/handlers/admin.rs

use std::path::PathBuf;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{Config, DEFAULT_LANGUAGE},
    error::AppError,
    models::{
        answer_option::{AnswerOption, CreateOptionRequest, UpdateOptionRequest},
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
        quiz::{CreateQuizRequest, Quiz, QuizDetail, QuizFilter, QuizSummary, UpdateQuizRequest},
    },
    utils::html::clean_html,
};

/// Media sub-directory holding question images.
const QUESTION_IMAGE_DIR: &str = "questions";

/// Lists quizzes, including inactive ones unless `?active=` says otherwise.
/// `?q=` searches titles and descriptions.
/// Admin only.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Query(filter): Query<QuizFilter>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = QuizSummary::search(&pool, &filter).await.map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Creates a new quiz.
/// Admin only.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let now = Utc::now();
    let id = sqlx::query(
        r#"
        INSERT INTO quizzes
        (title, description, time_limit, language, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.title.trim())
    .bind(clean_html(&payload.description))
    .bind(payload.time_limit)
    .bind(payload.language.as_deref().unwrap_or(DEFAULT_LANGUAGE))
    .bind(payload.is_active.unwrap_or(true))
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    tracing::info!(quiz_id = id, "Quiz created");
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

/// Returns a quiz with all of its questions and options in display order.
/// Admin only.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = Quiz::find(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = Question::list_for_quiz(&pool, id).await?;

    Ok(Json(QuizDetail { quiz, questions }))
}

/// Updates a quiz by ID.
/// Admin only.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title.trim().to_string());
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
    }

    if let Some(time_limit) = payload.time_limit {
        separated.push("time_limit = ");
        separated.push_bind_unseparated(time_limit);
    }

    if let Some(language) = payload.language {
        separated.push("language = ");
        separated.push_bind_unseparated(language);
    }

    if let Some(is_active) = payload.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }

    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a quiz together with its questions and options.
/// Admin only.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!(quiz_id = id, "Quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Adds a question to a quiz.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    Quiz::find(&pool, quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let id = sqlx::query(
        r#"
        INSERT INTO questions
        (quiz_id, text, display_order, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(quiz_id)
    .bind(clean_html(&payload.text))
    .bind(payload.order.unwrap_or(0))
    .bind(Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

/// Updates a question by ID.
/// Admin only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = Question::find(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if payload.text.is_none() && payload.order.is_none() && !payload.remove_image {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(text) = payload.text {
        separated.push("text = ");
        separated.push_bind_unseparated(clean_html(&text));
    }

    if let Some(order) = payload.order {
        separated.push("display_order = ");
        separated.push_bind_unseparated(order);
    }

    if payload.remove_image {
        separated.push("image = NULL");
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if payload.remove_image {
        if let Some(old) = question.image {
            remove_media(&config.media_root, &old).await;
        }
    }

    Ok(StatusCode::OK)
}

/// Deletes a question and its options.
/// Admin only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Stores an uploaded image for a question, replacing any previous one.
///
/// Expects a multipart body with an `image` file field.
/// Admin only.
pub async fn upload_question_image(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let question = Question::find(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(|name| PathBuf::from(name).extension().map(|e| e.to_string_lossy().to_lowercase()))
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded image is empty".to_string()));
        }

        let file_name = match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let relative = format!("{QUESTION_IMAGE_DIR}/{file_name}");

        let dir = PathBuf::from(&config.media_root).join(QUESTION_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), &bytes).await?;

        sqlx::query("UPDATE questions SET image = ? WHERE id = ?")
            .bind(&relative)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to attach image: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        if let Some(old) = question.image {
            remove_media(&config.media_root, &old).await;
        }

        tracing::info!(question_id = id, image = %relative, size = bytes.len(), "Question image stored");
        return Ok(Json(json!({"image": relative})));
    }

    Err(AppError::BadRequest("Missing 'image' file field".to_string()))
}

async fn remove_media(media_root: &str, relative: &str) {
    let path = PathBuf::from(media_root).join(relative);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Adds an option to a question.
/// Admin only.
pub async fn create_option(
    State(pool): State<SqlitePool>,
    Path(question_id): Path<i64>,
    Json(payload): Json<CreateOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    Question::find(&pool, question_id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let id = sqlx::query(
        r#"
        INSERT INTO options
        (question_id, text, is_correct, display_order)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(question_id)
    .bind(payload.text.trim())
    .bind(payload.is_correct)
    .bind(payload.order.unwrap_or(0))
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create option: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

/// Updates an option by ID.
/// Admin only.
pub async fn update_option(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.is_empty() {
        return AnswerOption::find(&pool, id)
            .await?
            .map(|_| StatusCode::OK)
            .ok_or(AppError::NotFound("Option not found".to_string()));
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE options SET ");
    let mut separated = builder.separated(", ");

    if let Some(text) = payload.text {
        separated.push("text = ");
        separated.push_bind_unseparated(text.trim().to_string());
    }

    if let Some(is_correct) = payload.is_correct {
        separated.push("is_correct = ");
        separated.push_bind_unseparated(is_correct);
    }

    if let Some(order) = payload.order {
        separated.push("display_order = ");
        separated.push_bind_unseparated(order);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update option: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Option not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an option by ID.
/// Admin only.
pub async fn delete_option(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM options WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete option: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Option not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
