//! Sessions and the request identity extractor

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use journal_core::{authorize, Actor, Operation};

use crate::error::ApiError;
use crate::AppState;

/// Idle time after which a session is forgotten
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    actor: Actor,
    last_seen: Instant,
}

/// Server-side sessions keyed by opaque token
///
/// Every lookup refreshes a session; one left idle past the timeout is
/// dropped on its next lookup or when another session starts.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a session and return its token
    pub async fn create(&self, actor: Actor) -> String {
        let token = generate_session_token();
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "Pruned idle sessions");
        }

        sessions.insert(
            token.clone(),
            SessionEntry {
                actor,
                last_seen: now,
            },
        );
        token
    }

    /// The session's actor, refreshing its idle clock
    pub async fn get(&self, token: &str) -> Option<Actor> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(token)?;

        if now.duration_since(entry.last_seen) >= self.idle_timeout {
            let user_id = entry.actor.user_id;
            sessions.remove(token);
            tracing::debug!(?user_id, "Session expired");
            return None;
        }

        entry.last_seen = now;
        Some(entry.actor)
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

/// Generate a new session token
pub fn generate_session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Identity of the caller, resolved from a bearer token or session cookie
///
/// Unknown or missing tokens resolve to the anonymous reader.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Option<String>,
    pub actor: Actor,
}

impl Session {
    /// The actor, or a redirect to the login page for anonymous callers
    pub fn require_login(&self) -> Result<Actor, ApiError> {
        if self.actor.is_authenticated() {
            Ok(self.actor)
        } else {
            Err(ApiError::LoginRequired)
        }
    }

    /// Logged in and allowed to perform `operation`
    pub fn require(&self, operation: Operation) -> Result<Actor, ApiError> {
        let actor = self.require_login()?;
        authorize(&actor, operation)?;
        Ok(actor)
    }
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers, &state.config.session.cookie_name));

        if let Some(token) = token {
            if let Some(actor) = state.sessions.get(&token).await {
                return Ok(Session {
                    token: Some(token),
                    actor,
                });
            }
        }

        Ok(Session {
            token: None,
            actor: Actor::anonymous(),
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(cookie_name: &str, token: &str) -> String {
    format!("{}={}; HttpOnly; Path=/; SameSite=Lax", cookie_name, token)
}

/// `Set-Cookie` value that clears the session cookie
pub fn expired_cookie(cookie_name: &str) -> String {
    format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", cookie_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use journal_core::{Role, UserId};

    #[test]
    fn test_generate_token() {
        let token = generate_session_token();
        assert_eq!(token.len(), 32);
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; journal_session=xyz"),
        );
        assert_eq!(cookie_token(&headers, "journal_session").as_deref(), Some("xyz"));
        assert_eq!(cookie_token(&headers, "sid"), None);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = SessionStore::new();
        let actor = Actor::user(UserId(3), Role::Editor);

        let token = store.create(actor).await;
        assert_eq!(store.get(&token).await, Some(actor));

        assert!(store.remove(&token).await);
        assert_eq!(store.get(&token).await, None);
        assert!(!store.remove(&token).await);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::with_idle_timeout(Duration::from_millis(50));
        let stale = store.create(Actor::user(UserId(1), Role::Author)).await;
        let also_stale = store.create(Actor::user(UserId(2), Role::Reviewer)).await;

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(store.get(&stale).await, None);
        assert_eq!(store.sessions.read().await.len(), 1);

        let fresh = store.create(Actor::user(UserId(3), Role::Editor)).await;
        let sessions = store.sessions.read().await;
        assert!(!sessions.contains_key(&also_stale));
        assert!(sessions.contains_key(&fresh));
    }

    #[tokio::test]
    async fn test_lookup_keeps_session_alive() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(60));
        let actor = Actor::user(UserId(4), Role::Author);
        let token = store.create(actor).await;

        let first_seen = store.sessions.read().await[&token].last_seen;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.get(&token).await, Some(actor));
        assert!(store.sessions.read().await[&token].last_seen > first_seen);
    }

    #[test]
    fn test_require() {
        let anonymous = Session {
            token: None,
            actor: Actor::anonymous(),
        };
        assert!(matches!(
            anonymous.require(Operation::ExportReport),
            Err(ApiError::LoginRequired)
        ));

        let author = Session {
            token: Some("t".to_string()),
            actor: Actor::user(UserId(1), Role::Author),
        };
        assert!(author.require(Operation::SubmitManuscript).is_ok());
        assert!(matches!(
            author.require(Operation::ExportReport),
            Err(ApiError::Journal(journal_core::JournalError::Forbidden { .. }))
        ));
    }

    #[test]
    fn test_cookie_strings() {
        assert_eq!(
            session_cookie("journal_session", "t"),
            "journal_session=t; HttpOnly; Path=/; SameSite=Lax"
        );
        assert!(expired_cookie("journal_session").ends_with("Max-Age=0"));
    }
}
