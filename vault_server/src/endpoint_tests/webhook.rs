use std::net::IpAddr;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use vault_common::Secret;
use vault_engine::{
    db_types::{Kobo, Reference},
    webhook::sign_payload,
    LedgerError,
    ReconciliationApi,
};

use super::{
    helpers::{pending_transaction, send_request, signed_webhook_request, signing_secret, webhook_body},
    mocks::MockLedger,
};
use crate::{config::ServerOptions, routes::PaystackWebhookRoute};

fn configure(ledger: MockLedger, options: ServerOptions) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = ReconciliationApi::new(ledger, signing_secret());
        cfg.service(PaystackWebhookRoute::<MockLedger>::new())
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(options));
    }
}

/// A ledger that must never be touched.
fn untouchable_ledger() -> MockLedger {
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_transaction_by_reference().never();
    ledger.expect_mark_successful_and_credit().never();
    ledger.expect_mark_failed().never();
    ledger
}

#[actix_web::test]
async fn bad_signature_is_rejected_before_the_ledger_is_consulted() {
    let _ = env_logger::try_init().ok();
    let reference = Reference::random();
    let req = TestRequest::post()
        .uri("/paystack-verification-webhook")
        .insert_header(("x-paystack-signature", "deadbeef".repeat(16)))
        .set_payload(webhook_body("charge.success", &reference, "500000"));
    let res = send_request(req, configure(untouchable_ledger(), ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.body.contains("error"), "was: {}", res.body);
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/paystack-verification-webhook")
        .set_payload(webhook_body("charge.success", &Reference::random(), "500000"));
    let res = send_request(req, configure(untouchable_ledger(), ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn unconfigured_secret_rejects_webhooks_signed_with_an_empty_key() {
    let _ = env_logger::try_init().ok();
    let body = webhook_body("charge.success", &Reference::random(), "99999999");
    let empty = Secret::new(String::new());
    let req = TestRequest::post()
        .uri("/paystack-verification-webhook")
        .insert_header(("x-paystack-signature", sign_payload(&body, &empty)))
        .set_payload(body);
    let configure = move |cfg: &mut ServiceConfig| {
        let api = ReconciliationApi::new(untouchable_ledger(), empty);
        cfg.service(PaystackWebhookRoute::<MockLedger>::new())
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(ServerOptions::default()));
    };
    let res = send_request(req, configure).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn signed_but_malformed_payload_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let body = br#"{"event":"charge.success","data":{"offline_reference":"R1","amount":500000}}"#.to_vec();
    let res = send_request(signed_webhook_request(body), configure(untouchable_ledger(), ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body = webhook_body("charge.success", &Reference::random(), "5000.00");
    let res = send_request(signed_webhook_request(body), configure(untouchable_ledger(), ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn success_event_credits_the_reported_amount() {
    let _ = env_logger::try_init().ok();
    let reference = Reference::random();
    let mut ledger = MockLedger::new();
    ledger
        .expect_fetch_transaction_by_reference()
        .withf(move |r| *r == reference)
        .times(1)
        .returning(move |r| Ok(Some(pending_transaction(1, *r, 500_000))));
    ledger
        .expect_mark_successful_and_credit()
        .withf(move |r, amount| *r == reference && *amount == Kobo::from(500_000))
        .times(1)
        .returning(|_, _| Ok(true));
    ledger.expect_mark_failed().never();
    let body = webhook_body("paymentrequest.success", &reference, r#""500000""#);
    let res = send_request(signed_webhook_request(body), configure(ledger, ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("credited"), "was: {}", res.body);
}

#[actix_web::test]
async fn replayed_event_is_acknowledged_without_a_second_credit() {
    let _ = env_logger::try_init().ok();
    let reference = Reference::random();
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_transaction_by_reference().returning(move |r| Ok(Some(pending_transaction(1, *r, 500_000))));
    ledger.expect_mark_successful_and_credit().times(1).returning(|_, _| Ok(false));
    let body = webhook_body("charge.success", &reference, "500000");
    let res = send_request(signed_webhook_request(body), configure(ledger, ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("already resolved"), "was: {}", res.body);
}

#[actix_web::test]
async fn failure_event_marks_the_transaction_failed() {
    let _ = env_logger::try_init().ok();
    let reference = Reference::random();
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_transaction_by_reference().returning(move |r| Ok(Some(pending_transaction(1, *r, 500_000))));
    ledger.expect_mark_successful_and_credit().never();
    ledger.expect_mark_failed().withf(move |r| *r == reference).times(1).returning(|_| Ok(true));
    let body = webhook_body("charge.failed", &reference, "500000");
    let res = send_request(signed_webhook_request(body), configure(ledger, ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("failed"), "was: {}", res.body);
}

#[actix_web::test]
async fn unknown_reference_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_transaction_by_reference().times(1).returning(|_| Ok(None));
    ledger.expect_mark_successful_and_credit().never();
    let body = webhook_body("charge.success", &Reference::random(), "500000");
    let res = send_request(signed_webhook_request(body), configure(ledger, ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("unknown reference"), "was: {}", res.body);
}

#[actix_web::test]
async fn other_events_are_ignored() {
    let _ = env_logger::try_init().ok();
    let body = br#"{"event":"subscription.create","data":{}}"#.to_vec();
    let res = send_request(signed_webhook_request(body), configure(untouchable_ledger(), ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("subscription.create"), "was: {}", res.body);
}

#[actix_web::test]
async fn unavailable_ledger_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let mut ledger = MockLedger::new();
    ledger
        .expect_fetch_transaction_by_reference()
        .returning(|_| Err(LedgerError::DatabaseError("database is locked".into())));
    ledger.expect_mark_successful_and_credit().never();
    let body = webhook_body("charge.success", &Reference::random(), "500000");
    let res = send_request(signed_webhook_request(body), configure(ledger, ServerOptions::default())).await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn peers_off_the_whitelist_are_refused() {
    let _ = env_logger::try_init().ok();
    let allowed: IpAddr = "52.31.139.75".parse().unwrap();
    let options = ServerOptions { paystack_whitelist: Some(vec![allowed]), ..Default::default() };
    let body = webhook_body("charge.success", &Reference::random(), "500000");
    let req = signed_webhook_request(body).peer_addr("10.0.0.7:5555".parse().unwrap());
    let res = send_request(req, configure(untouchable_ledger(), options)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn whitelisted_peers_behind_a_proxy_are_accepted() {
    let _ = env_logger::try_init().ok();
    let allowed: IpAddr = "52.31.139.75".parse().unwrap();
    let options =
        ServerOptions { paystack_whitelist: Some(vec![allowed]), use_x_forwarded_for: true, ..Default::default() };
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_transaction_by_reference().times(1).returning(|_| Ok(None));
    let body = webhook_body("charge.success", &Reference::random(), "500000");
    let req = signed_webhook_request(body)
        .peer_addr("10.0.0.7:5555".parse().unwrap())
        .insert_header(("X-Forwarded-For", "52.31.139.75"));
    let res = send_request(req, configure(ledger, options)).await;
    assert_eq!(res.status, StatusCode::OK);
}
