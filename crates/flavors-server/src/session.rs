//! Login sessions.
//!
//! A successful login yields an opaque bearer token mapped, in memory, to
//! the username.  Sessions do not survive a restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub display_name: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Start a session and return its token.
    pub async fn create(&self, username: &str, display_name: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let session = Session {
            username: username.to_string(),
            display_name: display_name.to_string(),
            issued_at: Utc::now(),
        };
        self.sessions.lock().await.insert(token.clone(), session);
        token
    }

    /// The live session for `token`; expired sessions are dropped.
    pub async fn resolve(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get(token)?;
        if self.is_expired(session, Utc::now()) {
            sessions.remove(token);
            return None;
        }
        Some(session.clone())
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().await.remove(token).is_some()
    }

    pub async fn purge_expired(&self) {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "expired sessions purged");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.issued_at) >= self.ttl
    }
}

/// `Authorization: Bearer <token>` value, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for handlers that require a logged-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ServerError::Unauthorized("Please login first.".into()))?;
        state
            .sessions
            .resolve(token)
            .await
            .map(CurrentUser)
            .ok_or_else(|| ServerError::Unauthorized("Session expired, please login again.".into()))
    }
}
