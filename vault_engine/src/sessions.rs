//! In-memory session registry.
//!
//! A session has two clocks. The *maximum expiry* is fixed at creation and is the only thing [`SessionStore::validate`]
//! looks at. The *refresh expiry* is shorter and only lives in the browser cookie, so an idle browser drops its cookie
//! quickly while an active one can call [`SessionStore::refresh`] until the maximum expiry is reached.
//!
//! Sessions are not persisted. Restarting the process logs everyone out.
use std::{collections::HashMap, sync::RwLock};

use chrono::{DateTime, Duration, Utc};
use log::*;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db_types::Role;

/// Absolute lifetime of a session, in minutes.
pub const DEFAULT_SESSION_LIFETIME_MINS: i64 = 5 * 60;
/// Lifetime of the client cookie, in minutes.
pub const DEFAULT_REFRESH_WINDOW_MINS: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No session exists for this token")]
    SessionNotFound,
    #[error("The session has expired")]
    SessionExpired,
    #[error("The session has been revoked")]
    SessionRevoked,
    #[error("Insufficient permissions. Required role: {0}")]
    Forbidden(Role),
    #[error("The session store is unavailable: {0}")]
    StoreUnavailable(String),
}

impl SessionError {
    /// True for the errors that mean "log in again", as opposed to a permissions or internal problem.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::SessionNotFound | Self::SessionExpired | Self::SessionRevoked)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub maximum_lifetime: Duration,
    pub refresh_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            maximum_lifetime: Duration::minutes(DEFAULT_SESSION_LIFETIME_MINS),
            refresh_window: Duration::minutes(DEFAULT_REFRESH_WINDOW_MINS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub maximum_expiry: DateTime<Utc>,
    pub authenticated: bool,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// What the browser gets to keep: the token and the refresh expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCookie {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    config: SessionConfig,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self { config, sessions: RwLock::new(HashMap::new()) }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn create_session(&self, user_id: i64, role: Role) -> Result<SessionCookie, SessionError> {
        self.create_session_at(user_id, role, Utc::now())
    }

    pub fn create_session_at(&self, user_id: i64, role: Role, now: DateTime<Utc>) -> Result<SessionCookie, SessionError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            error!("🔐️ Error getting lock on session table: {e}");
            SessionError::StoreUnavailable(e.to_string())
        })?;
        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
            warn!("🔐️ Session id collision. Generating a new one.");
        };
        let maximum_expiry = now + self.config.maximum_lifetime;
        let session = Session { id: id.clone(), user_id, role, created_at: now, maximum_expiry, authenticated: true };
        sessions.insert(id.clone(), session);
        debug!("🔐️ New {role} session for user #{user_id}. {} sessions in table", sessions.len());
        Ok(SessionCookie { token: id, expires_at: self.cookie_expiry(now, maximum_expiry) })
    }

    pub fn validate(&self, token: &str) -> Result<Session, SessionError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let sessions = self.sessions.read().map_err(|e| {
            error!("🔐️ Error getting lock on session table: {e}");
            SessionError::StoreUnavailable(e.to_string())
        })?;
        let session = sessions.get(token).ok_or(SessionError::SessionNotFound)?;
        if now >= session.maximum_expiry {
            return Err(SessionError::SessionExpired);
        }
        if !session.authenticated {
            return Err(SessionError::SessionRevoked);
        }
        Ok(session.clone())
    }

    pub fn require_role(&self, token: &str, role: Role) -> Result<Session, SessionError> {
        self.require_role_at(token, role, Utc::now())
    }

    pub fn require_role_at(&self, token: &str, role: Role, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let session = self.validate_at(token, now)?;
        if session.role != role {
            debug!("🔐️ User #{} has role {} but {role} is required", session.user_id, session.role);
            return Err(SessionError::Forbidden(role));
        }
        Ok(session)
    }

    /// Logs a session out. The record is kept so that the token reports as revoked rather than unknown until it is
    /// purged. Revoking a revoked session is fine.
    pub fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            error!("🔐️ Error getting lock on session table: {e}");
            SessionError::StoreUnavailable(e.to_string())
        })?;
        let session = sessions.get_mut(token).ok_or(SessionError::SessionNotFound)?;
        if session.authenticated {
            session.authenticated = false;
            debug!("🔐️ Session for user #{} revoked", session.user_id);
        }
        Ok(())
    }

    pub fn refresh(&self, token: &str) -> Result<SessionCookie, SessionError> {
        self.refresh_at(token, Utc::now())
    }

    /// Issues a fresh cookie for a valid session. The session's maximum expiry does not move.
    pub fn refresh_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionCookie, SessionError> {
        let session = self.validate_at(token, now)?;
        trace!("🔐️ Refreshing session cookie for user #{}", session.user_id);
        Ok(SessionCookie { token: session.id, expires_at: self.cookie_expiry(now, session.maximum_expiry) })
    }

    /// Drops every expired or revoked session and returns how many were removed.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            error!("🔐️ Error getting lock on session table: {e}");
            SessionError::StoreUnavailable(e.to_string())
        })?;
        let before = sessions.len();
        sessions.retain(|_, s| s.authenticated && now < s.maximum_expiry);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("🔐️ Purged {removed} stale sessions. {} remain", sessions.len());
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cookie_expiry(&self, now: DateTime<Utc>, maximum_expiry: DateTime<Utc>) -> DateTime<Utc> {
        (now + self.config.refresh_window).min(maximum_expiry)
    }
}
