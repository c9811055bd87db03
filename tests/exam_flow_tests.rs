// tests/exam_flow_tests.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use quiz_server::{
    config::{Config, SESSION_COOKIE},
    routes,
    state::AppState,
    utils::session::{SessionId, SessionStore},
};
use reqwest::{
    Client, Response, StatusCode,
    cookie::{CookieStore, Jar},
    header::LOCATION,
    redirect::Policy,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

struct TestApp {
    address: String,
    pool: SqlitePool,
    sessions: SessionStore,
    client: Client,
    jar: Arc<Jar>,
}

/// Spawns the app on a random port over a private in-memory database.
async fn spawn_app() -> TestApp {
    // A single connection that never expires keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "exam_flow_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        media_root: std::env::temp_dir()
            .join(format!("quiz-media-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        port: 0,
        session_ttl: 3600,
    };

    let state = AppState::new(pool.clone(), config).expect("Failed to load templates");
    let sessions = state.sessions.clone();
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Behave like a browser, but let the tests look at every redirect.
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .cookie_provider(jar.clone())
        .redirect(Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        pool,
        sessions,
        client,
        jar,
    }
}

impl TestApp {
    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .form(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Session id the server assigned to this client.
    fn session_id(&self) -> SessionId {
        let url = self.address.parse().unwrap();
        let header = self.jar.cookies(&url).expect("no session cookie yet");
        header
            .to_str()
            .unwrap()
            .split("; ")
            .find_map(|pair| pair.strip_prefix(&format!("{SESSION_COOKIE}=")))
            .expect("session cookie missing")
            .parse()
            .unwrap()
    }

    /// Goes through name entry and instructions so the exam clock runs.
    async fn begin_exam(&self, quiz_id: i64, name: &str) {
        let response = self
            .post_form(&format!("/quiz/{quiz_id}/start/"), &[("name", name)])
            .await;
        assert_see_other(&response, &format!("/quiz/{quiz_id}/instructions/"));

        let response = self
            .post_form(&format!("/quiz/{quiz_id}/instructions/"), &[])
            .await;
        assert_see_other(&response, &format!("/quiz/{quiz_id}/"));
    }
}

fn assert_see_other(response: &Response, location: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION].to_str().unwrap(), location);
}

async fn seed_quiz(pool: &SqlitePool, title: &str, time_limit: i64, is_active: bool) -> i64 {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO quizzes (title, description, time_limit, is_active, created_at, updated_at)
         VALUES (?, '', ?, ?, ?, ?)",
    )
    .bind(title)
    .bind(time_limit)
    .bind(is_active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

async fn seed_question(pool: &SqlitePool, quiz_id: i64, text: &str, order: i64) -> i64 {
    sqlx::query("INSERT INTO questions (quiz_id, text, display_order, created_at) VALUES (?, ?, ?, ?)")
        .bind(quiz_id)
        .bind(text)
        .bind(order)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

async fn seed_option(pool: &SqlitePool, question_id: i64, text: &str, is_correct: bool) -> i64 {
    sqlx::query("INSERT INTO options (question_id, text, is_correct) VALUES (?, ?, ?)")
        .bind(question_id)
        .bind(text)
        .bind(is_correct)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

/// A question with one right and one wrong option: (question, right, wrong).
async fn seed_two_choice(pool: &SqlitePool, quiz_id: i64, text: &str, order: i64) -> (i64, i64, i64) {
    let question = seed_question(pool, quiz_id, text, order).await;
    let right = seed_option(pool, question, &format!("{text} right"), true).await;
    let wrong = seed_option(pool, question, &format!("{text} wrong"), false).await;
    (question, right, wrong)
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;
    let response = app.get("/random_path_that_does_not_exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn home_lists_only_active_quizzes() {
    let app = spawn_app().await;
    seed_quiz(&app.pool, "Visible quiz", 10, true).await;
    seed_quiz(&app.pool, "Hidden quiz", 10, false).await;

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Visible quiz"));
    assert!(!body.contains("Hidden quiz"));
}

#[tokio::test]
async fn inactive_and_missing_quizzes_are_not_found() {
    let app = spawn_app().await;
    let hidden = seed_quiz(&app.pool, "Hidden quiz", 10, false).await;

    assert_eq!(app.get(&format!("/quiz/{hidden}/start/")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/quiz/9999/start/").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_flow_scores_three_of_four() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Bangla grammar", 10, true).await;
    let q1 = seed_two_choice(&app.pool, quiz, "First", 0).await;
    let q2 = seed_two_choice(&app.pool, quiz, "Second", 1).await;
    let q3 = seed_two_choice(&app.pool, quiz, "Third", 2).await;
    let q4 = seed_two_choice(&app.pool, quiz, "Fourth", 3).await;

    let response = app.get(&format!("/quiz/{quiz}/start/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form(&format!("/quiz/{quiz}/start/"), &[("name", "  Rahim  ")])
        .await;
    assert_see_other(&response, &format!("/quiz/{quiz}/instructions/"));

    let body = app.get(&format!("/quiz/{quiz}/instructions/")).await.text().await.unwrap();
    assert!(body.contains("Rahim"));
    assert!(body.contains("Questions: 4"));

    let response = app.post_form(&format!("/quiz/{quiz}/instructions/"), &[]).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/"));

    let response = app.get(&format!("/quiz/{quiz}/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("First right"));
    assert!(body.contains(&format!("name=\"question_{}\"", q4.0)));
    assert!(!body.contains("is_correct"));

    let answers = [
        (format!("question_{}", q1.0), q1.1.to_string()),
        (format!("question_{}", q2.0), q2.1.to_string()),
        (format!("question_{}", q3.0), q3.1.to_string()),
        (format!("question_{}", q4.0), q4.2.to_string()),
        ("question_abc".to_string(), "1".to_string()),
        (format!("question_{}", q1.0 + 1000), "oops".to_string()),
    ];
    let form: Vec<(&str, &str)> = answers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let response = app.post_form(&format!("/quiz/{quiz}/submit/"), &form).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/completion/"));

    assert_eq!(app.get(&format!("/quiz/{quiz}/completion/")).await.status(), StatusCode::OK);
    // Completion is informational and can be revisited.
    assert_eq!(app.get(&format!("/quiz/{quiz}/completion/")).await.status(), StatusCode::OK);

    let response = app.get(&format!("/quiz/{quiz}/results/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("<strong id=\"score\">3</strong>"));
    assert!(body.contains("<span id=\"total\">4</span>"));
    assert!(body.contains("<strong id=\"percentage\">75"));
    assert!(body.contains("Rahim"));

    // Results are shown once.
    let response = app.get(&format!("/quiz/{quiz}/results/")).await;
    assert_see_other(&response, "/");
    let body = app.get("/").await.text().await.unwrap();
    assert!(body.contains("No results found. Please complete a quiz first."));

    let session = app.sessions.load(app.session_id()).await;
    assert!(session.quiz_results.is_none());
    assert!(session.user_name.is_none());
}

#[tokio::test]
async fn option_of_another_question_does_not_count() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Cross answers", 10, true).await;
    let q1 = seed_two_choice(&app.pool, quiz, "One", 0).await;
    let q2 = seed_two_choice(&app.pool, quiz, "Two", 1).await;

    app.begin_exam(quiz, "Karim").await;

    // Both ids are correct options, but each belongs to the other question.
    let answers = [
        (format!("question_{}", q1.0), q2.1.to_string()),
        (format!("question_{}", q2.0), q1.1.to_string()),
    ];
    let form: Vec<(&str, &str)> = answers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    app.post_form(&format!("/quiz/{quiz}/submit/"), &form).await;

    let session = app.sessions.load(app.session_id()).await;
    let results = session.quiz_results.expect("results stored");
    assert_eq!(results.score, 0);
    assert_eq!(results.total_questions, 2);
    assert_eq!(results.percentage, 0.0);
}

#[tokio::test]
async fn submission_clears_in_progress_state() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Cleanup", 10, true).await;
    let q1 = seed_two_choice(&app.pool, quiz, "Only", 0).await;

    app.begin_exam(quiz, "Karim").await;
    let field = format!("question_{}", q1.0);
    let value = q1.1.to_string();
    app.post_form(&format!("/quiz/{quiz}/submit/"), &[(field.as_str(), value.as_str())])
        .await;

    let session = app.sessions.load(app.session_id()).await;
    assert!(session.quiz_id.is_none());
    assert!(session.start_time.is_none());
    assert!(session.answers.is_empty());
    assert_eq!(session.user_name.as_deref(), Some("Karim"));
    assert_eq!(session.quiz_results.unwrap().percentage, 100.0);

    // A second submission is out of sequence.
    let response = app.post_form(&format!("/quiz/{quiz}/submit/"), &[]).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/start/"));
}

#[tokio::test]
async fn empty_quiz_redirects_home_and_scores_zero() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Nothing here", 10, true).await;

    app.begin_exam(quiz, "Karim").await;

    let response = app.get(&format!("/quiz/{quiz}/")).await;
    assert_see_other(&response, "/");
    let body = app.get("/").await.text().await.unwrap();
    assert!(body.contains("This quiz has no questions."));

    let response = app.post_form(&format!("/quiz/{quiz}/submit/"), &[]).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/completion/"));

    let session = app.sessions.load(app.session_id()).await;
    let results = session.quiz_results.expect("results stored");
    assert_eq!(results.total_questions, 0);
    assert_eq!(results.percentage, 0.0);
}

#[tokio::test]
async fn steps_without_a_name_bounce_to_start() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Guarded", 10, true).await;
    seed_two_choice(&app.pool, quiz, "Q", 0).await;

    let response = app.get(&format!("/quiz/{quiz}/instructions/")).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/start/"));
    let body = app.get(&format!("/quiz/{quiz}/start/")).await.text().await.unwrap();
    assert!(body.contains("Please enter your name to start the quiz."));

    let response = app.post_form(&format!("/quiz/{quiz}/instructions/"), &[]).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/start/"));

    let response = app.get(&format!("/quiz/{quiz}/")).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/start/"));

    let response = app.post_form(&format!("/quiz/{quiz}/submit/"), &[]).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/start/"));
    let body = app.get(&format!("/quiz/{quiz}/start/")).await.text().await.unwrap();
    assert!(body.contains("Please start the quiz first."));

    let response = app.get(&format!("/quiz/{quiz}/completion/")).await;
    assert_see_other(&response, "/");

    let response = app.get(&format!("/quiz/{quiz}/results/")).await;
    assert_see_other(&response, "/");
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Names", 10, true).await;

    let response = app.post_form(&format!("/quiz/{quiz}/start/"), &[("name", "   ")]).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/start/"));

    let response = app.get(&format!("/quiz/{quiz}/instructions/")).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/start/"));
}

#[tokio::test]
async fn session_for_one_quiz_does_not_open_another() {
    let app = spawn_app().await;
    let first = seed_quiz(&app.pool, "First", 10, true).await;
    let second = seed_quiz(&app.pool, "Second", 10, true).await;

    app.post_form(&format!("/quiz/{first}/start/"), &[("name", "Karim")]).await;

    let response = app.get(&format!("/quiz/{second}/instructions/")).await;
    assert_see_other(&response, &format!("/quiz/{second}/start/"));
}

#[tokio::test]
async fn exam_view_before_timer_goes_to_instructions() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Patience", 10, true).await;
    seed_two_choice(&app.pool, quiz, "Q", 0).await;

    app.post_form(&format!("/quiz/{quiz}/start/"), &[("name", "Karim")]).await;

    let response = app.get(&format!("/quiz/{quiz}/")).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/instructions/"));
}

#[tokio::test]
async fn expired_exam_is_auto_submitted() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Too slow", 10, true).await;
    seed_two_choice(&app.pool, quiz, "A", 0).await;
    seed_two_choice(&app.pool, quiz, "B", 1).await;

    app.begin_exam(quiz, "Karim").await;
    app.sessions
        .update(app.session_id(), |s| s.start_timer(Utc::now() - Duration::minutes(11)))
        .await;

    let response = app.get(&format!("/quiz/{quiz}/")).await;
    assert_see_other(&response, &format!("/quiz/{quiz}/completion/"));

    let session = app.sessions.load(app.session_id()).await;
    let results = session.quiz_results.expect("results stored");
    assert_eq!(results.score, 0);
    assert_eq!(results.total_questions, 2);
    assert_eq!(results.user_name, "Karim");
    assert!(session.start_time.is_none());

    let body = app.get(&format!("/quiz/{quiz}/results/")).await.text().await.unwrap();
    assert!(body.contains("<span id=\"total\">2</span>"));
}

#[tokio::test]
async fn submit_only_accepts_post() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Methods", 10, true).await;

    let response = app.get(&format!("/quiz/{quiz}/submit/")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn check_time_requires_a_running_timer() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Clock", 10, true).await;

    let response = app.get(&format!("/quiz/{quiz}/check-time/")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"error": "Quiz not started"}));
}

#[tokio::test]
async fn check_time_reports_remaining_seconds() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Clock", 10, true).await;
    seed_two_choice(&app.pool, quiz, "Q", 0).await;

    app.begin_exam(quiz, "Karim").await;
    app.sessions
        .update(app.session_id(), |s| s.start_timer(Utc::now() - Duration::minutes(5)))
        .await;

    let response = app.get(&format!("/quiz/{quiz}/check-time/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    let remaining = body["time_remaining"].as_i64().unwrap();
    assert!((295..=300).contains(&remaining), "remaining = {remaining}");
    assert_eq!(body["expired"], false);

    app.sessions
        .update(app.session_id(), |s| s.start_timer(Utc::now() - Duration::minutes(30)))
        .await;
    let body: serde_json::Value = app
        .get(&format!("/quiz/{quiz}/check-time/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({"time_remaining": 0, "expired": true}));
}

#[tokio::test]
async fn corrupted_start_time_restarts_the_clock() {
    let app = spawn_app().await;
    let quiz = seed_quiz(&app.pool, "Clock", 10, true).await;
    seed_two_choice(&app.pool, quiz, "Q", 0).await;

    app.begin_exam(quiz, "Karim").await;
    app.sessions
        .update(app.session_id(), |s| s.start_time = Some("garbage".to_string()))
        .await;

    let body: serde_json::Value = app
        .get(&format!("/quiz/{quiz}/check-time/"))
        .await
        .json()
        .await
        .unwrap();
    let remaining = body["time_remaining"].as_i64().unwrap();
    assert!((595..=600).contains(&remaining), "remaining = {remaining}");

    // The exam view renders instead of auto-submitting.
    assert_eq!(app.get(&format!("/quiz/{quiz}/")).await.status(), StatusCode::OK);
}
