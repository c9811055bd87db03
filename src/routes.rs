// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::{Any, CorsLayer}, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam},
    state::AppState,
    utils::{
        jwt::{admin_middleware, auth_middleware},
        session::session_middleware,
    },
};

/// Upper bound for question image uploads.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Assembles the main application router.
///
/// * Quiz-taker pages behind the session cookie middleware.
/// * Admin login and the JWT-protected admin API under `/api`.
/// * Uploaded media under `/media`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let exam_routes = Router::new()
        .route("/", get(exam::home))
        .route("/quiz/{id}/start/", get(exam::start_page).post(exam::start_quiz))
        .route(
            "/quiz/{id}/instructions/",
            get(exam::instructions).post(exam::start_timer),
        )
        .route("/quiz/{id}/", get(exam::quiz_page))
        .route("/quiz/{id}/submit/", post(exam::submit_quiz))
        .route("/quiz/{id}/completion/", get(exam::completion))
        .route("/quiz/{id}/results/", get(exam::results))
        .route("/quiz/{id}/check-time/", get(exam::check_time))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware));

    let auth_routes = Router::new().route("/login", post(auth::login));

    let admin_routes = Router::new()
        .route("/quizzes", get(admin::list_quizzes).post(admin::create_quiz))
        .route(
            "/quizzes/{id}",
            get(admin::get_quiz)
                .put(admin::update_quiz)
                .delete(admin::delete_quiz),
        )
        .route("/quizzes/{id}/questions", post(admin::create_question))
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route(
            "/questions/{id}/image",
            post(admin::upload_question_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/questions/{id}/options", post(admin::create_option))
        .route(
            "/options/{id}",
            put(admin::update_option).delete(admin::delete_option),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let media = ServeDir::new(&state.config.media_root);

    Router::new()
        .merge(exam_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest_service("/media", media)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
