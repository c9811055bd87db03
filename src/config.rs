// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Name of the cookie carrying the exam session token.
pub const SESSION_COOKIE: &str = "quiz_session";

/// Language tag applied to quizzes created without one.
pub const DEFAULT_LANGUAGE: &str = "বাংলা";

/// Display name recorded in a results snapshot when the session lost it.
pub const GUEST_NAME: &str = "Guest";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Directory uploaded question images are written to and served from.
    pub media_root: String,
    pub port: u16,
    /// Seconds an exam session may sit idle before it is forgotten.
    pub session_ttl: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://quiz.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let media_root = env::var("MEDIA_ROOT")
            .unwrap_or_else(|_| "media".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let session_ttl = env::var("SESSION_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1_209_600);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
            media_root,
            port,
            session_ttl,
        }
    }
}
