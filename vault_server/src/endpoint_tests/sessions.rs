use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use vault_engine::{
    db_types::{Role, UserCredentials},
    hash_password,
    AuthApi,
    AuthApiError,
    SessionStore,
};

use super::{
    helpers::{logged_in, send_request, with_session},
    mocks::MockCredentials,
};
use crate::{
    config::ServerOptions,
    routes::{logout, refresh_session, GrantAdminRoute, LoginRoute, VerifyUserRoute},
    session::SESSION_COOKIE,
};

const PASSWORD: &str = "open-sesame-123";

fn credentials(email_verified: bool, is_admin: bool) -> UserCredentials {
    UserCredentials {
        user_id: 42,
        email: "ada@example.com".into(),
        password_hash: hash_password(PASSWORD).unwrap(),
        is_admin,
        email_verified,
    }
}

fn configure(store: MockCredentials, sessions: web::Data<SessionStore>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.service(LoginRoute::<MockCredentials>::new())
            .service(logout)
            .service(refresh_session)
            .service(VerifyUserRoute::<MockCredentials>::new())
            .service(GrantAdminRoute::<MockCredentials>::new())
            .app_data(web::Data::new(AuthApi::new(store)))
            .app_data(web::Data::new(ServerOptions::default()))
            .app_data(sessions);
    }
}

fn login_request(email: &str, password: &str) -> TestRequest {
    TestRequest::post().uri("/login").set_json(serde_json::json!({ "email": email, "password": password }))
}

#[actix_web::test]
async fn login_sets_a_session_cookie() {
    let _ = env_logger::try_init().ok();
    let mut store = MockCredentials::new();
    let creds = credentials(true, false);
    store.expect_fetch_credentials().withf(|email| email == "ada@example.com").returning(move |_| Ok(Some(creds.clone())));
    let sessions = web::Data::new(SessionStore::default());
    let res = send_request(login_request(" Ada@Example.com ", PASSWORD), configure(store, sessions.clone())).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
    let cookie = res.cookie(SESSION_COOKIE).expect("session cookie");
    assert_eq!(cookie.http_only(), Some(true));
    assert!(cookie.max_age().is_some());
    let session = sessions.validate(cookie.value()).expect("session should be live");
    assert_eq!(session.user_id, 42);
    assert_eq!(session.role, Role::Basic);
    assert!(res.body.contains(r#""role":"basic""#), "was: {}", res.body);
}

#[actix_web::test]
async fn admins_log_in_with_the_admin_role() {
    let _ = env_logger::try_init().ok();
    let mut store = MockCredentials::new();
    let creds = credentials(true, true);
    store.expect_fetch_credentials().returning(move |_| Ok(Some(creds.clone())));
    let sessions = web::Data::new(SessionStore::default());
    let res = send_request(login_request("ada@example.com", PASSWORD), configure(store, sessions.clone())).await;
    let cookie = res.cookie(SESSION_COOKIE).expect("session cookie");
    assert_eq!(sessions.validate(cookie.value()).unwrap().role, Role::Admin);
}

#[actix_web::test]
async fn bad_credentials_do_not_say_which_part_was_wrong() {
    let _ = env_logger::try_init().ok();
    let mut store = MockCredentials::new();
    let creds = credentials(true, false);
    store.expect_fetch_credentials().returning(move |_| Ok(Some(creds.clone())));
    let sessions = web::Data::new(SessionStore::default());
    let wrong_password =
        send_request(login_request("ada@example.com", "not-the-password"), configure(store, sessions.clone())).await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert!(wrong_password.cookie(SESSION_COOKIE).is_none());

    let mut store = MockCredentials::new();
    store.expect_fetch_credentials().returning(|_| Ok(None));
    let no_account = send_request(login_request("bob@example.com", PASSWORD), configure(store, sessions.clone())).await;
    assert_eq!(no_account.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, no_account.body);
    assert!(sessions.is_empty());
}

#[actix_web::test]
async fn unverified_users_cannot_log_in() {
    let _ = env_logger::try_init().ok();
    let mut store = MockCredentials::new();
    let creds = credentials(false, false);
    store.expect_fetch_credentials().returning(move |_| Ok(Some(creds.clone())));
    let sessions = web::Data::new(SessionStore::default());
    let res = send_request(login_request("ada@example.com", PASSWORD), configure(store, sessions.clone())).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(sessions.is_empty());
}

#[actix_web::test]
async fn logout_revokes_the_session_and_clears_the_cookie() {
    let _ = env_logger::try_init().ok();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/logout"), &token);
    let res = send_request(req, configure(MockCredentials::new(), sessions.clone())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.cookie(SESSION_COOKIE).expect("removal cookie").value(), "");
    assert!(sessions.validate(&token).is_err());
    // Logging out again is harmless
    let req = with_session(TestRequest::post().uri("/logout"), &token);
    let res = send_request(req, configure(MockCredentials::new(), sessions)).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[actix_web::test]
async fn refresh_extends_the_cookie() {
    let _ = env_logger::try_init().ok();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/session/refresh"), &token);
    let res = send_request(req, configure(MockCredentials::new(), sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
    assert_eq!(res.cookie(SESSION_COOKIE).expect("session cookie").value(), token);
}

#[actix_web::test]
async fn missing_or_stale_sessions_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let (sessions, token) = logged_in(42, Role::Basic);
    let res = send_request(TestRequest::post().uri("/session/refresh"), configure(MockCredentials::new(), sessions.clone())).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.cookie(SESSION_COOKIE).expect("removal cookie").value(), "");

    sessions.revoke(&token).unwrap();
    let req = with_session(TestRequest::post().uri("/session/refresh"), &token);
    let res = send_request(req, configure(MockCredentials::new(), sessions)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.cookie(SESSION_COOKIE).expect("removal cookie").value(), "");
}

#[actix_web::test]
async fn basic_users_cannot_use_admin_routes() {
    let _ = env_logger::try_init().ok();
    let mut store = MockCredentials::new();
    store.expect_mark_email_verified().never();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/admin/users/7/verify"), &token);
    let res = send_request(req, configure(store, sessions.clone())).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    // The session itself is fine, so the cookie stays
    assert!(res.cookie(SESSION_COOKIE).is_none());
    assert!(sessions.validate(&token).is_ok());
}

#[actix_web::test]
async fn admins_can_verify_users_and_grant_admin() {
    let _ = env_logger::try_init().ok();
    let mut store = MockCredentials::new();
    store.expect_mark_email_verified().withf(|id| *id == 7).times(1).returning(|_| Ok(()));
    let (sessions, token) = logged_in(1, Role::Admin);
    let req = with_session(TestRequest::post().uri("/admin/users/7/verify"), &token);
    let res = send_request(req, configure(store, sessions.clone())).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);

    let mut store = MockCredentials::new();
    store.expect_grant_admin().withf(|id| *id == 7).times(1).returning(|_| Ok(()));
    let req = with_session(TestRequest::post().uri("/admin/users/7/grant_admin"), &token);
    let res = send_request(req, configure(store, sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
}

#[actix_web::test]
async fn verifying_a_missing_user_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut store = MockCredentials::new();
    store.expect_mark_email_verified().returning(|id| Err(AuthApiError::UserNotFound(id)));
    let (sessions, token) = logged_in(1, Role::Admin);
    let req = with_session(TestRequest::post().uri("/admin/users/99/verify"), &token);
    let res = send_request(req, configure(store, sessions)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
