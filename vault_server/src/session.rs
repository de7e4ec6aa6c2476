//! Session cookie plumbing.
//!
//! Handlers that need a logged-in user take an [`AuthenticatedUser`] (or an [`AdminUser`]) argument. The extractor
//! reads the `session` cookie and checks it against the [`SessionStore`] in the app data.
use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::Payload,
    web,
    FromRequest,
    HttpRequest,
};
use chrono::Utc;
use futures::future::{ready, Ready};
use log::*;
use vault_engine::{db_types::Role, Session, SessionCookie, SessionError, SessionStore};

use crate::errors::ServerError;

pub const SESSION_COOKIE: &str = "session";

/// A request made with a valid session.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Session);

impl AuthenticatedUser {
    pub fn user_id(&self) -> i64 {
        self.0.user_id
    }

    pub fn token(&self) -> &str {
        self.0.id.as_str()
    }
}

/// A request made with a valid session that holds the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Session);

fn session_store(req: &HttpRequest) -> Result<&web::Data<SessionStore>, ServerError> {
    req.app_data::<web::Data<SessionStore>>().ok_or_else(|| {
        error!("💻️ No session store has been registered with the app");
        ServerError::InitializeError("Session store is not configured".into())
    })
}

fn session_token(req: &HttpRequest) -> Result<String, ServerError> {
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()).ok_or(ServerError::Session(SessionError::SessionNotFound))
}

fn extract_session(req: &HttpRequest, role: Option<Role>) -> Result<Session, ServerError> {
    let store = session_store(req)?;
    let token = session_token(req)?;
    let session = match role {
        Some(role) => store.require_role(&token, role),
        None => store.validate(&token),
    }
    .map_err(|e| {
        debug!("💻️ Rejecting session for {}. {e}", req.path());
        e
    })?;
    Ok(session)
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_session(req, None).map(AuthenticatedUser))
    }
}

impl FromRequest for AdminUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_session(req, Some(Role::Admin)).map(AdminUser))
    }
}

/// The `Set-Cookie` value for a freshly issued or refreshed session.
pub fn session_cookie(cookie: &SessionCookie, secure: bool) -> Cookie<'static> {
    let max_age = (cookie.expires_at - Utc::now()).num_seconds().max(0);
    Cookie::build(SESSION_COOKIE, cookie.token.clone())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age))
        .finish()
}

/// The `Set-Cookie` value that removes the session cookie from the browser.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// The session token on the request, if there is one. Unlike the extractors, this does not validate it.
pub fn raw_session_token(req: &HttpRequest) -> Option<String> {
    session_token(req).ok()
}
