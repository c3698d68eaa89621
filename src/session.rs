use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use rand::{distributions::Alphanumeric, Rng};
use time::{Duration, OffsetDateTime};
use tracing::debug;

pub const SESSION_COOKIE: &str = "session_id";
const SESSION_TTL: Duration = Duration::hours(24);
const TOKEN_LEN: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Role> {
        match s {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Server-side record for one authenticated browser.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i32,
    pub role: Role,
    pub nome: String,
    pub cognome: String,
    pub expires_at: OffsetDateTime,
}

/// Identity captured at login time; the store adds the expiry.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub user_id: i32,
    pub role: Role,
    pub nome: String,
    pub cognome: String,
}

/// In-memory session map. Tokens are random URL-safe strings with a fixed
/// 24h TTL; lookups evict expired entries lazily. Nothing survives a
/// process restart.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, identity: SessionIdentity) -> String {
        self.create_at(identity, OffsetDateTime::now_utc())
    }

    pub fn lookup(&self, token: &str) -> Option<Session> {
        self.lookup_at(token, OffsetDateTime::now_utc())
    }

    pub fn destroy(&self, token: &str) {
        let mut map = self.inner.lock().unwrap();
        if map.remove(token).is_some() {
            debug!("session destroyed");
        }
    }

    fn create_at(&self, identity: SessionIdentity, now: OffsetDateTime) -> String {
        let token: String = rand::rngs::OsRng
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let session = Session {
            user_id: identity.user_id,
            role: identity.role,
            nome: identity.nome,
            cognome: identity.cognome,
            expires_at: now + SESSION_TTL,
        };
        let mut map = self.inner.lock().unwrap();
        map.insert(token.clone(), session);
        debug!(user_id = identity.user_id, "session created");
        token
    }

    fn lookup_at(&self, token: &str, now: OffsetDateTime) -> Option<Session> {
        let mut map = self.inner.lock().unwrap();
        match map.get(token) {
            Some(session) if session.expires_at > now => Some(session.clone()),
            Some(_) => {
                map.remove(token);
                None
            }
            None => None,
        }
    }
}

/// Set-Cookie value announcing a fresh session.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; Max-Age={}",
        SESSION_TTL.whole_seconds()
    )
}

/// Set-Cookie value clearing the session cookie on the client.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
}

/// Pull the session token out of the request's Cookie header, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let name = parts.next()?.trim();
        if name == SESSION_COOKIE {
            return parts.next().map(|v| v.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            user_id: 7,
            role: Role::Student,
            nome: "Mario".into(),
            cognome: "Rossi".into(),
        }
    }

    #[test]
    fn create_then_lookup_returns_the_identity() {
        let store = SessionStore::new();
        let token = store.create(identity());
        let session = store.lookup(&token).expect("session should exist");
        assert_eq!(session.user_id, 7);
        assert_eq!(session.role, Role::Student);
        assert_eq!(session.nome, "Mario");
    }

    #[test]
    fn unknown_token_is_absent() {
        let store = SessionStore::new();
        assert!(store.lookup("no-such-token").is_none());
    }

    #[test]
    fn destroy_removes_the_session() {
        let store = SessionStore::new();
        let token = store.create(identity());
        store.destroy(&token);
        assert!(store.lookup(&token).is_none());
    }

    #[test]
    fn session_expires_after_24_hours() {
        let store = SessionStore::new();
        let now = OffsetDateTime::now_utc();
        let token = store.create_at(identity(), now);

        let just_before = now + Duration::hours(23) + Duration::minutes(59);
        assert!(store.lookup_at(&token, just_before).is_some());

        let just_after = now + Duration::hours(24) + Duration::minutes(1);
        assert!(store.lookup_at(&token, just_after).is_none());
        // Lazy eviction: the expired entry is gone for good.
        assert!(store.lookup_at(&token, just_before).is_none());
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let store = SessionStore::new();
        let a = store.create(identity());
        let b = store.create(identity());
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc123");
        assert!(cookie.starts_with("session_id=abc123"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));

        let cleared = clear_session_cookie();
        assert!(cleared.starts_with("session_id=;"));
        assert!(cleared.contains("Expires=Thu, 01 Jan 1970"));
    }

    #[test]
    fn token_parsed_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=tok123; lang=it"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("tok123"));

        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark"),
        );
        assert_eq!(token_from_headers(&headers), None);
    }
}
