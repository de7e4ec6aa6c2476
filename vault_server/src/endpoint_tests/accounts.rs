use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use vault_engine::{
    db_types::{AccountBalances, FamilyVaultPlan, Kobo, Role, TargetSavingsPlan},
    AccountApi,
    AccountApiError,
    SessionStore,
};

use super::{
    helpers::{logged_in, pending_transaction, send_request, with_session},
    mocks::MockAccountManager,
};
use crate::{
    data_objects::{BalancesResponse, FamilyVaultPlanView, TargetSavingsPlanView, TransactionView},
    routes::{
        AddFamilyVaultMemberRoute,
        BalancesRoute,
        CreateFamilyVaultPlanRoute,
        CreateTargetSavingsPlanRoute,
        FamilyVaultPlansRoute,
        TargetSavingsPlansRoute,
        TransactionsRoute,
    },
};

fn configure(accounts: MockAccountManager, sessions: web::Data<SessionStore>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.service(BalancesRoute::<MockAccountManager>::new())
            .service(TransactionsRoute::<MockAccountManager>::new())
            .service(FamilyVaultPlansRoute::<MockAccountManager>::new())
            .service(CreateFamilyVaultPlanRoute::<MockAccountManager>::new())
            .service(AddFamilyVaultMemberRoute::<MockAccountManager>::new())
            .service(TargetSavingsPlansRoute::<MockAccountManager>::new())
            .service(CreateTargetSavingsPlanRoute::<MockAccountManager>::new())
            .app_data(web::Data::new(AccountApi::new(accounts)))
            .app_data(sessions);
    }
}

fn family_plan(id: i64, creator_id: i64) -> FamilyVaultPlan {
    FamilyVaultPlan {
        id,
        creator_id,
        name: "School fees".into(),
        description: String::new(),
        balance: Kobo::from(1_250_000),
        number_of_members: 3,
        created_at: Utc::now(),
    }
}

#[actix_web::test]
async fn balances_need_a_session() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_fetch_balances().never();
    let sessions = web::Data::new(SessionStore::default());
    let res = send_request(TestRequest::get().uri("/balances"), configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn balances_are_reported_in_kobo_and_naira() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_fetch_balances().withf(|id| *id == 42).times(1).returning(|user_id| {
        Ok(Some(AccountBalances {
            user_id,
            savings: Kobo::from(1_250_050),
            loans: Kobo::default(),
            investment: Kobo::from(99),
        }))
    });
    let (sessions, token) = logged_in(42, Role::Basic);
    let res = send_request(with_session(TestRequest::get().uri("/balances"), &token), configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
    let balances: BalancesResponse = serde_json::from_str(&res.body).unwrap();
    assert_eq!(balances.savings.kobo, Kobo::from(1_250_050));
    assert_eq!(balances.savings.naira, 12_500);
    assert_eq!(balances.loans.naira, 0);
    assert_eq!(balances.investment.naira, 0);
}

#[actix_web::test]
async fn balances_for_a_deleted_user_are_not_found() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_fetch_balances().returning(|_| Ok(None));
    let (sessions, token) = logged_in(42, Role::Basic);
    let res = send_request(with_session(TestRequest::get().uri("/balances"), &token), configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn transactions_for_the_session_user() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts
        .expect_fetch_transactions_for_user()
        .withf(|id| *id == 42)
        .returning(|user_id| Ok(vec![pending_transaction(user_id, vault_engine::db_types::Reference::random(), 500_000)]));
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::get().uri("/transactions"), &token);
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::OK);
    let txs: Vec<TransactionView> = serde_json::from_str(&res.body).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].amount.kobo, Kobo::from(500_000));
    assert!(txs[0].credited.is_none());
}

#[actix_web::test]
async fn family_vault_plans_know_who_created_them() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_fetch_family_vault_plans().returning(|_| Ok(vec![family_plan(1, 42), family_plan(2, 7)]));
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::get().uri("/family_vault"), &token);
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::OK);
    let plans: Vec<FamilyVaultPlanView> = serde_json::from_str(&res.body).unwrap();
    assert!(plans[0].is_creator);
    assert!(!plans[1].is_creator);
    assert_eq!(plans[0].balance.naira, 12_500);
}

#[actix_web::test]
async fn create_family_vault_plan() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts
        .expect_create_family_vault_plan()
        .withf(|creator, plan| *creator == 42 && plan.name == "School fees")
        .times(1)
        .returning(|_, _| Ok(5));
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/family_vault"), &token)
        .set_json(serde_json::json!({ "name": "  School fees ", "description": "Term 2" }));
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
    assert_eq!(res.body, r#"{"plan_id":5}"#);
}

#[actix_web::test]
async fn family_vault_plans_do_not_take_goals() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_create_family_vault_plan().never();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/family_vault"), &token)
        .set_json(serde_json::json!({ "name": "School fees", "goal": 100_000 }));
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn only_members_can_add_members() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_fetch_family_vault_plans().returning(|_| Ok(vec![family_plan(1, 42)]));
    accounts.expect_add_family_vault_member().withf(|plan, user| *plan == 1 && *user == 9).times(1).returning(|_, _| Ok(()));
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/family_vault/1/members"), &token)
        .set_json(serde_json::json!({ "user_id": 9 }));
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);

    let mut accounts = MockAccountManager::new();
    accounts.expect_fetch_family_vault_plans().returning(|_| Ok(vec![family_plan(1, 42)]));
    accounts.expect_add_family_vault_member().never();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/family_vault/2/members"), &token)
        .set_json(serde_json::json!({ "user_id": 9 }));
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn target_savings_plans_report_progress() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_fetch_target_savings_plans().returning(|user_id| {
        Ok(vec![TargetSavingsPlan {
            id: 3,
            user_id,
            name: "New laptop".into(),
            description: String::new(),
            balance: Kobo::from(30_000_000),
            goal: Kobo::from(120_000_000),
            created_at: Utc::now(),
        }])
    });
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::get().uri("/target_savings"), &token);
    let res = send_request(req, configure(accounts, sessions)).await;
    let plans: Vec<TargetSavingsPlanView> = serde_json::from_str(&res.body).unwrap();
    assert_eq!(plans[0].completion_percentage, 25);
    assert_eq!(plans[0].goal.naira, 1_200_000);
}

#[actix_web::test]
async fn target_savings_plans_need_a_goal() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_create_target_savings_plan().never();
    let (sessions, token) = logged_in(42, Role::Basic);
    let req =
        with_session(TestRequest::post().uri("/target_savings"), &token).set_json(serde_json::json!({ "name": "Laptop" }));
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let mut accounts = MockAccountManager::new();
    accounts
        .expect_create_target_savings_plan()
        .withf(|user, plan| *user == 42 && plan.goal == Some(Kobo::from(120_000_000)))
        .times(1)
        .returning(|_, _| Ok(3));
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::post().uri("/target_savings"), &token)
        .set_json(serde_json::json!({ "name": "Laptop", "goal": 120_000_000 }));
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::OK, "was: {}", res.body);
}

#[actix_web::test]
async fn database_errors_are_server_errors() {
    let _ = env_logger::try_init().ok();
    let mut accounts = MockAccountManager::new();
    accounts.expect_fetch_transactions_for_user().returning(|_| Err(AccountApiError::DatabaseError("disk I/O".into())));
    let (sessions, token) = logged_in(42, Role::Basic);
    let req = with_session(TestRequest::get().uri("/transactions"), &token);
    let res = send_request(req, configure(accounts, sessions)).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}
