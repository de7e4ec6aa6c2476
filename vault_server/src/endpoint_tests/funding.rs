use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use vault_engine::{
    db_types::{Kobo, PaymentOriginator, PendingTransaction, Reference, Role, TransactionStatus},
    LedgerError,
    ReconciliationApi,
    SessionStore,
};

use super::{
    helpers::{logged_in, pending_transaction, send_request, signing_secret, with_session},
    mocks::MockLedger,
};
use crate::{
    config::ServerOptions,
    data_objects::{FundingIntentResponse, TransactionView},
    routes::{AddFamilyVaultFundsRoute, AddSoloSavingsFundsRoute, AddTargetSavingsFundsRoute, AdminTransactionRoute},
};

const PUBLIC_KEY: &str = "pk_test_vault";

fn configure(ledger: MockLedger, sessions: web::Data<SessionStore>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let options = ServerOptions { paystack_public_key: PUBLIC_KEY.into(), ..Default::default() };
        cfg.service(AddSoloSavingsFundsRoute::<MockLedger>::new())
            .service(AddFamilyVaultFundsRoute::<MockLedger>::new())
            .service(AddTargetSavingsFundsRoute::<MockLedger>::new())
            .service(AdminTransactionRoute::<MockLedger>::new())
            .app_data(web::Data::new(ReconciliationApi::new(ledger, signing_secret())))
            .app_data(web::Data::new(options))
            .app_data(sessions);
    }
}

/// A ledger that stores whatever it is given.
fn accepting_ledger() -> MockLedger {
    let mut ledger = MockLedger::new();
    ledger.expect_insert_pending_transaction().times(1).returning(|tx| {
        Ok(PendingTransaction {
            id: 11,
            user_id: tx.user_id,
            plan_id: tx.plan_id,
            reference: tx.reference,
            originator: tx.originator,
            amount: tx.amount,
            verification_status: TransactionStatus::Pending,
            fulfillment_status: TransactionStatus::Pending,
            credited_amount: None,
            created_at: Utc::now(),
            verified_at: None,
        })
    });
    ledger
}

#[actix_web::test]
async fn solo_savings_intent_mints_a_reference() {
    let _ = env_logger::try_init().ok();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/solo_savings/add_funds"), &token)
        .set_json(serde_json::json!({ "amount": 500_000 }));
    let res = send_request(req, configure(accepting_ledger(), sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
    let intent: FundingIntentResponse = serde_json::from_str(&res.body).unwrap();
    assert_eq!(intent.originator, PaymentOriginator::SoloSavings);
    assert_eq!(intent.plan_id, vault_engine::db_types::PLAN_SENTINEL_ID);
    assert_eq!(intent.amount.kobo, Kobo::from(500_000));
    assert_eq!(intent.paystack_public_key, PUBLIC_KEY);
}

#[actix_web::test]
async fn client_supplied_references_are_kept() {
    let _ = env_logger::try_init().ok();
    let reference = Reference::random();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/family_vault/3/add_funds"), &token)
        .set_json(serde_json::json!({ "amount": 250_000, "reference": reference }));
    let res = send_request(req, configure(accepting_ledger(), sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
    let intent: FundingIntentResponse = serde_json::from_str(&res.body).unwrap();
    assert_eq!(intent.reference, reference);
    assert_eq!(intent.originator, PaymentOriginator::FamilySavings);
    assert_eq!(intent.plan_id, 3);
}

#[actix_web::test]
async fn duplicate_references_conflict() {
    let _ = env_logger::try_init().ok();
    let mut ledger = MockLedger::new();
    ledger.expect_insert_pending_transaction().returning(|tx| Err(LedgerError::DuplicateReference(tx.reference)));
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/target_savings/4/add_funds"), &token)
        .set_json(serde_json::json!({ "amount": 250_000, "reference": Reference::random() }));
    let res = send_request(req, configure(ledger, sessions)).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn plans_belonging_to_someone_else_are_not_found() {
    let _ = env_logger::try_init().ok();
    let mut ledger = MockLedger::new();
    ledger.expect_insert_pending_transaction().returning(|tx| {
        Err(LedgerError::PlanNotFound { plan_id: tx.plan_id, user_id: tx.user_id, originator: tx.originator })
    });
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/target_savings/4/add_funds"), &token)
        .set_json(serde_json::json!({ "amount": 250_000 }));
    let res = send_request(req, configure(ledger, sessions)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn amounts_must_be_positive_whole_kobo() {
    let _ = env_logger::try_init().ok();
    for amount in [serde_json::json!(0), serde_json::json!(-500), serde_json::json!(12.5)] {
        let mut ledger = MockLedger::new();
        ledger.expect_insert_pending_transaction().never();
        let (sessions, token) = logged_in(42, Role::Basic);
        let req = with_session(TestRequest::post().uri("/solo_savings/add_funds"), &token)
            .set_json(serde_json::json!({ "amount": amount }));
        let res = send_request(req, configure(ledger, sessions)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "amount {amount} was accepted");
    }
}

#[actix_web::test]
async fn funding_needs_a_session() {
    let _ = env_logger::try_init().ok();
    let mut ledger = MockLedger::new();
    ledger.expect_insert_pending_transaction().never();
    let sessions = web::Data::new(SessionStore::default());
    let req = TestRequest::post().uri("/solo_savings/add_funds").set_json(serde_json::json!({ "amount": 500_000 }));
    let res = send_request(req, configure(ledger, sessions)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admins_can_look_up_transactions() {
    let _ = env_logger::try_init().ok();
    let reference = Reference::random();
    let mut ledger = MockLedger::new();
    ledger
        .expect_fetch_transaction_by_reference()
        .withf(move |r| *r == reference)
        .returning(|r| Ok(Some(pending_transaction(42, *r, 500_000))));
    let (sessions, token) = logged_in(1, Role::Admin);
    let req = with_session(TestRequest::get().uri(&format!("/admin/transactions/{reference}")), &token);
    let res = send_request(req, configure(ledger, sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
    let tx: TransactionView = serde_json::from_str(&res.body).unwrap();
    assert_eq!(tx.reference, reference);
    assert_eq!(tx.status, TransactionStatus::Pending);

    let (sessions, token) = logged_in(1, Role::Admin);
    let req = with_session(TestRequest::get().uri("/admin/transactions/not-a-uuid"), &token);
    let res = send_request(req, configure(MockLedger::new(), sessions)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn basic_users_cannot_look_up_transactions() {
    let _ = env_logger::try_init().ok();
    let mut ledger = MockLedger::new();
    ledger.expect_fetch_transaction_by_reference().never();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::get().uri(&format!("/admin/transactions/{}", Reference::random())), &token);
    let res = send_request(req, configure(ledger, sessions)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}
