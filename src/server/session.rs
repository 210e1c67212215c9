//! In-memory login sessions.
//!
//! A session is a random token handed out at login, carried back in the
//! `session` cookie or an `Authorization: Bearer` header.
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use super::AppState;
use crate::error::{Error, Result};
use crate::users::random_hex;

pub const SESSION_COOKIE: &str = "session";

/// What the server remembers about a logged in player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    /// The question last dealt, waiting for an answer
    pub question_id: Option<i64>,
    pub created: Instant,
    pub last_seen: Instant,
}

impl Session {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }
}

/// Added to the request by [`require_session`]
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub user_id: i64,
}

/// Drops expired sessions, then the oldest of `user_id`'s beyond `keep - 1`
fn prune(
    sessions: &mut HashMap<String, Session>,
    user_id: i64,
    keep: usize,
    now: Instant,
    ttl: Duration,
) {
    let before = sessions.len();
    sessions.retain(|_, s| !s.is_expired(now, ttl));

    let mut mine: Vec<(Instant, String)> = sessions
        .iter()
        .filter(|(_, s)| s.user_id == user_id)
        .map(|(token, s)| (s.created, token.clone()))
        .collect();
    if mine.len() >= keep {
        mine.sort();
        for (_, token) in mine.iter().take(mine.len() + 1 - keep) {
            sessions.remove(token);
        }
    }

    let dropped = before - sessions.len();
    if dropped > 0 {
        debug!("Dropped {} stale sessions", dropped);
    }
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Session token from a Bearer header or the session cookie
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

impl AppState {
    fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.settings.session_ttl_minutes * 60)
    }

    /// New session for `user_id`; expired sessions and the player's oldest
    /// extra sessions are dropped first
    pub fn start_session(&self, user_id: i64) -> Result<String> {
        let token = random_hex::<32>();
        let now = Instant::now();
        let mut sessions = self.sessions()?;
        prune(
            &mut sessions,
            user_id,
            self.settings.max_sessions_per_user,
            now,
            self.session_ttl(),
        );
        sessions.insert(
            token.clone(),
            Session {
                user_id,
                question_id: None,
                created: now,
                last_seen: now,
            },
        );
        Ok(token)
    }

    pub fn end_session(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.sessions()?.remove(token))
    }

    /// A live session, marked as seen; an expired one is removed
    pub fn session(&self, token: &str) -> Result<Option<Session>> {
        let now = Instant::now();
        let ttl = self.session_ttl();
        let mut sessions = self.sessions()?;
        let expired = match sessions.get(token) {
            Some(session) => session.is_expired(now, ttl),
            None => return Ok(None),
        };
        if expired {
            sessions.remove(token);
            return Ok(None);
        }
        Ok(sessions.get_mut(token).map(|session| {
            session.last_seen = now;
            session.clone()
        }))
    }

    pub fn set_current_question(&self, token: &str, question_id: Option<i64>) -> Result<()> {
        match self.sessions()?.get_mut(token) {
            Some(session) => {
                session.question_id = question_id;
                Ok(())
            }
            None => Err(Error::Unauthorized("session expired, log in again".into())),
        }
    }
}

/// Rejects requests without a live session
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = token_from_headers(request.headers())
        .ok_or_else(|| Error::Unauthorized("log in to play".into()))?;
    let session = state
        .session(&token)?
        .ok_or_else(|| Error::Unauthorized("session expired, log in again".into()))?;

    request.extensions_mut().insert(CurrentSession {
        token,
        user_id: session.user_id,
    });
    Ok(next.run(request).await)
}
