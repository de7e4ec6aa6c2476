use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use log::*;
use vault_common::Secret;
use vault_engine::{AccountApi, AuthApi, ReconciliationApi, SessionStore, SqliteDatabase};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    routes::{
        health,
        logout,
        refresh_session,
        AddFamilyVaultFundsRoute,
        AddFamilyVaultMemberRoute,
        AddSoloSavingsFundsRoute,
        AddTargetSavingsFundsRoute,
        AdminTransactionRoute,
        BalancesRoute,
        CreateFamilyVaultPlanRoute,
        CreateTargetSavingsPlanRoute,
        FamilyVaultPlansRoute,
        GrantAdminRoute,
        LoginRoute,
        PaystackWebhookRoute,
        RegisterRoute,
        TargetSavingsPlansRoute,
        TransactionsRoute,
        VerifyUserRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let sessions = web::Data::new(SessionStore::new(config.sessions.clone()));
    let options = ServerOptions::from_config(&config);
    let signing_secret = config.paystack.secret_key.clone();
    info!(
        "💻️ Sessions last at most {} minutes, and must be refreshed every {} minutes",
        config.sessions.maximum_lifetime.num_minutes(),
        config.sessions.refresh_window.num_minutes()
    );
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("vault::access_log"))
            .configure(configure_app(db.clone(), signing_secret.clone(), options.clone(), sessions.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the APIs, shared state and every route. The session store is passed in rather than created here, since all
/// workers must share one.
pub fn configure_app(
    db: SqliteDatabase,
    signing_secret: Secret<String>,
    options: ServerOptions,
    sessions: web::Data<SessionStore>,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let reconciliation_api = ReconciliationApi::new(db.clone(), signing_secret);
        let auth_api = AuthApi::new(db.clone());
        let accounts_api = AccountApi::new(db);
        let auth_scope = web::scope("/auth")
            .service(RegisterRoute::<SqliteDatabase>::new())
            .service(LoginRoute::<SqliteDatabase>::new())
            .service(logout);
        let api_scope = web::scope("/api")
            .service(refresh_session)
            .service(BalancesRoute::<SqliteDatabase>::new())
            .service(TransactionsRoute::<SqliteDatabase>::new())
            .service(FamilyVaultPlansRoute::<SqliteDatabase>::new())
            .service(CreateFamilyVaultPlanRoute::<SqliteDatabase>::new())
            .service(AddFamilyVaultMemberRoute::<SqliteDatabase>::new())
            .service(TargetSavingsPlansRoute::<SqliteDatabase>::new())
            .service(CreateTargetSavingsPlanRoute::<SqliteDatabase>::new())
            .service(AddSoloSavingsFundsRoute::<SqliteDatabase>::new())
            .service(AddFamilyVaultFundsRoute::<SqliteDatabase>::new())
            .service(AddTargetSavingsFundsRoute::<SqliteDatabase>::new())
            .service(PaystackWebhookRoute::<SqliteDatabase>::new())
            .service(VerifyUserRoute::<SqliteDatabase>::new())
            .service(GrantAdminRoute::<SqliteDatabase>::new())
            .service(AdminTransactionRoute::<SqliteDatabase>::new());
        cfg.app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(options))
            .app_data(sessions)
            .service(health)
            .service(auth_scope)
            .service(api_scope);
    }
}
