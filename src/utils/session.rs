// src/utils/session.rs

use std::{collections::HashMap, str::FromStr, sync::Arc};

use axum::{
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::SESSION_COOKIE,
    error::AppError,
    exam::session::{ExamSession, FlashLevel, FlashMessage},
};

/// Opaque token identifying one browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        SessionId(Uuid::new_v4())
    }

    fn from_cookie(jar: &CookieJar) -> Option<Self> {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| cookie.value().parse().ok())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

/// One stored session and the last time a request touched it.
#[derive(Debug, Clone)]
struct Entry {
    session: ExamSession,
    last_seen: DateTime<Utc>,
}

/// Server-side storage of exam sessions, keyed by the session cookie.
///
/// Entries live in memory only; a restart sends everyone back to the start
/// page. Sessions idle for longer than `ttl` are forgotten.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Entry>>>,
    ttl: TimeDelta,
}

impl SessionStore {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Snapshot of a session. Unknown or idle ids read as a fresh session.
    pub async fn load(&self, id: SessionId) -> ExamSession {
        self.load_at(id, Utc::now()).await
    }

    /// Mutates a session in place. Sessions left empty are dropped.
    pub async fn update<R>(&self, id: SessionId, f: impl FnOnce(&mut ExamSession) -> R) -> R {
        self.update_at(id, Utc::now(), f).await
    }

    async fn load_at(&self, id: SessionId, now: DateTime<Utc>) -> ExamSession {
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|entry| now - entry.last_seen <= self.ttl)
            .map(|entry| entry.session.clone())
            .unwrap_or_default()
    }

    async fn update_at<R>(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut ExamSession) -> R,
    ) -> R {
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_seen <= self.ttl);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped idle exam sessions");
        }

        let entry = sessions.entry(id).or_insert_with(|| Entry {
            session: ExamSession::default(),
            last_seen: now,
        });
        entry.last_seen = now;
        let result = f(&mut entry.session);
        if entry.session == ExamSession::default() {
            sessions.remove(&id);
        }
        result
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Axum Middleware: Session cookie.
///
/// Reads the session token from the cookie, issuing a new one when it is
/// missing or malformed, and injects the `SessionId` into the request
/// extensions. New cookies expire together with idle sessions.
pub async fn session_middleware(
    State(store): State<SessionStore>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(id) = SessionId::from_cookie(&jar) {
        req.extensions_mut().insert(id);
        return next.run(req).await;
    }

    let id = SessionId::generate();
    req.extensions_mut().insert(id);
    let response = next.run(req).await;

    let cookie = Cookie::build((SESSION_COOKIE, id.0.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(store.ttl().num_seconds()));

    (jar.add(cookie), response).into_response()
}

/// Extractor giving a handler access to the current browser's session.
///
/// Requires `session_middleware` on the route.
pub struct Session {
    id: SessionId,
    store: SessionStore,
}

impl<S> FromRequestParts<S> for Session
where
    SessionStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<SessionId>()
            .copied()
            .ok_or_else(|| {
                AppError::InternalServerError("session middleware is not installed".to_string())
            })?;

        Ok(Self {
            id,
            store: SessionStore::from_ref(state),
        })
    }
}

impl Session {
    pub async fn read(&self) -> ExamSession {
        self.store.load(self.id).await
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut ExamSession) -> R) -> R {
        self.store.update(self.id, f).await
    }

    pub async fn flash(&self, level: FlashLevel, text: impl Into<String>) {
        let text = text.into();
        self.update(|session| session.flash(level, text)).await;
    }

    pub async fn take_messages(&self) -> Vec<FlashMessage> {
        self.update(ExamSession::take_messages).await
    }
}
