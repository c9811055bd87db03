// src/handlers/exam.rs

//! Quiz-taker pages: start → instructions → timed exam → submit →
//! completion → results.
//!
//! Every out-of-sequence request is answered with a redirect and a flash
//! message, never an error page.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Form, Json,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tera::Tera;
use validator::{Validate, ValidationError};

use crate::{
    error::AppError,
    exam::{
        clock::Countdown,
        scoring::{grade, parse_answers},
        session::{ExamState, FlashLevel, QuizResults},
    },
    models::{
        question::{PublicQuestion, Question, QuestionWithOptions},
        quiz::{Quiz, QuizSummary},
    },
    templates::{page_context, render},
    utils::session::Session,
};

const ENTER_NAME: &str = "Please enter your name to start the quiz.";
const START_FIRST: &str = "Please start the quiz first.";
const READ_INSTRUCTIONS: &str = "Please read the instructions and start the exam.";
const NO_QUESTIONS: &str = "This quiz has no questions.";
const NO_RESULTS: &str = "No results found. Please complete a quiz first.";

fn start_url(quiz_id: i64) -> String {
    format!("/quiz/{quiz_id}/start/")
}

fn instructions_url(quiz_id: i64) -> String {
    format!("/quiz/{quiz_id}/instructions/")
}

fn quiz_url(quiz_id: i64) -> String {
    format!("/quiz/{quiz_id}/")
}

fn completion_url(quiz_id: i64) -> String {
    format!("/quiz/{quiz_id}/completion/")
}

/// Flashes a message and sends the browser elsewhere.
async fn bounce(session: &Session, level: FlashLevel, text: &str, to: &str) -> Response {
    session.flash(level, text).await;
    Redirect::to(to).into_response()
}

async fn active_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<Quiz, AppError> {
    Quiz::find_active(pool, quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Grades `answers` and moves the session to the submitted state.
///
/// Returns `None` when the session stopped taking this quiz in the meantime.
async fn finish_exam(
    session: &Session,
    quiz_id: i64,
    questions: &[QuestionWithOptions],
    answers: Option<HashMap<i64, i64>>,
) -> Option<QuizResults> {
    session
        .update(|s| {
            if !s.is_taking(quiz_id) {
                return None;
            }
            let answers = answers.unwrap_or_else(|| s.answers.clone());
            let score = grade(questions, &answers);
            Some(s.record_results(score).clone())
        })
        .await
}

/// Home page listing all active quizzes.
pub async fn home(
    State(pool): State<SqlitePool>,
    State(tera): State<Arc<Tera>>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let quizzes = QuizSummary::list_active(&pool).await?;

    let mut context = page_context(&session.take_messages().await);
    context.insert("quizzes", &quizzes);
    render(&tera, "home.html", &context)
}

/// Name entry page.
pub async fn start_page(
    State(pool): State<SqlitePool>,
    State(tera): State<Arc<Tera>>,
    session: Session,
    Path(quiz_id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let quiz = active_quiz(&pool, quiz_id).await?;

    let mut context = page_context(&session.take_messages().await);
    context.insert("quiz", &quiz);
    render(&tera, "start_quiz.html", &context)
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartQuizForm {
    #[serde(default)]
    #[validate(custom(function = validate_display_name))]
    pub name: String,
}

fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();
    if length == 0 || length > 100 {
        return Err(ValidationError::new("invalid_display_name"));
    }
    Ok(())
}

/// Records the quiz and the user's name. The clock starts later.
pub async fn start_quiz(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(quiz_id): Path<i64>,
    Form(form): Form<StartQuizForm>,
) -> Result<Response, AppError> {
    let quiz = active_quiz(&pool, quiz_id).await?;

    if form.validate().is_err() {
        return Ok(bounce(&session, FlashLevel::Warning, ENTER_NAME, &start_url(quiz.id)).await);
    }

    let user_name = form.name.trim().to_string();
    tracing::info!(quiz_id = quiz.id, user_name = %user_name, "Exam session started");
    let previous = session
        .update(|s| {
            let previous = s.state();
            s.begin(quiz.id, user_name);
            previous
        })
        .await;
    if let ExamState::ExamActive { quiz_id: abandoned } = previous {
        tracing::info!(quiz_id = abandoned, "Running exam abandoned for a new start");
    }

    Ok(Redirect::to(&instructions_url(quiz.id)).into_response())
}

/// Instructions shown before the timer starts.
pub async fn instructions(
    State(pool): State<SqlitePool>,
    State(tera): State<Arc<Tera>>,
    session: Session,
    Path(quiz_id): Path<i64>,
) -> Result<Response, AppError> {
    let quiz = active_quiz(&pool, quiz_id).await?;

    let state = session.read().await;
    if !state.is_taking(quiz.id) {
        return Ok(bounce(&session, FlashLevel::Warning, ENTER_NAME, &start_url(quiz.id)).await);
    }

    let total_questions = quiz.count_questions(&pool).await?;

    let mut context = page_context(&session.take_messages().await);
    context.insert("quiz", &quiz);
    context.insert("user_name", &state.user_name);
    context.insert("time_limit", &quiz.time_limit);
    context.insert("total_questions", &total_questions);
    Ok(render(&tera, "instructions.html", &context)?.into_response())
}

/// "Start the exam": records the start time.
pub async fn start_timer(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(quiz_id): Path<i64>,
) -> Result<Response, AppError> {
    let quiz = active_quiz(&pool, quiz_id).await?;

    let started = session
        .update(|s| {
            if !s.is_taking(quiz.id) {
                return false;
            }
            s.start_timer(Utc::now());
            true
        })
        .await;

    if !started {
        return Ok(bounce(&session, FlashLevel::Warning, ENTER_NAME, &start_url(quiz.id)).await);
    }

    tracing::info!(quiz_id = quiz.id, time_limit = quiz.time_limit, "Exam timer started");
    Ok(Redirect::to(&quiz_url(quiz.id)).into_response())
}

/// The timed exam itself.
///
/// Once the time limit has passed the exam is submitted with whatever
/// answers the session holds and the user lands on the completion page.
pub async fn quiz_page(
    State(pool): State<SqlitePool>,
    State(tera): State<Arc<Tera>>,
    session: Session,
    Path(quiz_id): Path<i64>,
) -> Result<Response, AppError> {
    let quiz = active_quiz(&pool, quiz_id).await?;

    let state = session.read().await;
    if !state.is_taking(quiz.id) {
        return Ok(bounce(&session, FlashLevel::Warning, ENTER_NAME, &start_url(quiz.id)).await);
    }

    let questions = Question::list_for_quiz(&pool, quiz.id).await?;
    if questions.is_empty() {
        return Ok(bounce(&session, FlashLevel::Error, NO_QUESTIONS, "/").await);
    }

    let now = Utc::now();
    let Some(start) = state.started_at(now) else {
        return Ok(bounce(
            &session,
            FlashLevel::Warning,
            READ_INSTRUCTIONS,
            &instructions_url(quiz.id),
        )
        .await);
    };

    let countdown = Countdown::new(start.instant(), quiz.time_limit, now);
    if countdown.expired {
        if let Some(results) = finish_exam(&session, quiz.id, &questions, None).await {
            tracing::info!(
                quiz_id = quiz.id,
                score = results.score,
                total = results.total_questions,
                "Exam auto-submitted after time limit"
            );
        }
        return Ok(Redirect::to(&completion_url(quiz.id)).into_response());
    }

    let public_questions: Vec<PublicQuestion> =
        questions.iter().map(QuestionWithOptions::to_public).collect();

    let mut context = page_context(&session.take_messages().await);
    context.insert("quiz", &quiz);
    context.insert("questions", &public_questions);
    context.insert("user_name", &state.user_name);
    context.insert("time_limit_minutes", &quiz.time_limit);
    context.insert("time_remaining_seconds", &countdown.time_remaining);
    Ok(render(&tera, "quiz.html", &context)?.into_response())
}

/// Grades the submitted answers and stores the results snapshot.
///
/// Form fields are `question_<id>=<option id>`; anything unparseable is
/// ignored.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(quiz_id): Path<i64>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let quiz = active_quiz(&pool, quiz_id).await?;

    if !session.read().await.is_taking(quiz.id) {
        return Ok(bounce(&session, FlashLevel::Warning, START_FIRST, &start_url(quiz.id)).await);
    }

    let answers = parse_answers(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let questions = Question::list_for_quiz(&pool, quiz.id).await?;

    match finish_exam(&session, quiz.id, &questions, Some(answers)).await {
        Some(results) => {
            tracing::info!(
                quiz_id = quiz.id,
                score = results.score,
                total = results.total_questions,
                percentage = results.percentage,
                "Exam submitted"
            );
            Ok(Redirect::to(&completion_url(quiz.id)).into_response())
        }
        None => Ok(bounce(&session, FlashLevel::Warning, START_FIRST, &start_url(quiz.id)).await),
    }
}

/// Confirmation page after submission. Leaves the results in place.
pub async fn completion(
    State(pool): State<SqlitePool>,
    State(tera): State<Arc<Tera>>,
    session: Session,
    Path(quiz_id): Path<i64>,
) -> Result<Response, AppError> {
    let quiz = active_quiz(&pool, quiz_id).await?;

    if session.read().await.quiz_results.is_none() {
        return Ok(bounce(&session, FlashLevel::Warning, NO_RESULTS, "/").await);
    }

    let mut context = page_context(&session.take_messages().await);
    context.insert("quiz", &quiz);
    Ok(render(&tera, "completion.html", &context)?.into_response())
}

/// Shows the results once, then forgets them and the user's name.
pub async fn results(
    State(pool): State<SqlitePool>,
    State(tera): State<Arc<Tera>>,
    session: Session,
    Path(quiz_id): Path<i64>,
) -> Result<Response, AppError> {
    let quiz = active_quiz(&pool, quiz_id).await?;

    let Some(results) = session.update(|s| s.take_results()).await else {
        return Ok(bounce(&session, FlashLevel::Warning, NO_RESULTS, "/").await);
    };

    let mut context = page_context(&session.take_messages().await);
    context.insert("quiz", &quiz);
    context.insert("user_name", &results.user_name);
    context.insert("score", &results.score);
    context.insert("total_questions", &results.total_questions);
    context.insert("percentage", &results.percentage);
    Ok(render(&tera, "results.html", &context)?.into_response())
}

/// Polled by the exam page: `{time_remaining, expired}`.
pub async fn check_time(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(quiz_id): Path<i64>,
) -> Result<Json<Countdown>, AppError> {
    let now = Utc::now();
    let Some(start) = session.read().await.started_at(now) else {
        return Err(AppError::BadRequest("Quiz not started".to_string()));
    };

    let quiz = Quiz::find(&pool, quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(Countdown::new(start.instant(), quiz.time_limit, now)))
}
