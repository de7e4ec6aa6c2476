//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use vault_engine::{
    db_types::{NewPendingTransaction, NewSavingsPlan, Reference},
    webhook::SIGNATURE_HEADER,
    AccountApi,
    AccountManagement,
    AuthApi,
    CredentialStore,
    LedgerGateway,
    NewUserRequest,
    ReconciliationApi,
    ReconciliationError,
    SessionError,
    SessionStore,
};

use crate::{
    config::ServerOptions,
    data_objects::{
        AddFundsRequest,
        BalancesResponse,
        FamilyVaultPlanView,
        FundingIntentResponse,
        JsonResponse,
        LoginRequest,
        LoginResponse,
        NewMemberRequest,
        NewPlanResponse,
        NewUserResponse,
        SessionResponse,
        TargetSavingsPlanView,
        TransactionView,
        WebhookResponse,
    },
    errors::ServerError,
    helpers::is_whitelisted_peer,
    session::{raw_session_token, removal_cookie, session_cookie, AdminUser, AuthenticatedUser},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(register => Post "/register" impl CredentialStore);
/// Creates a new user. The user cannot log in until an admin has verified their email address.
pub async fn register<B: CredentialStore>(
    body: web::Json<NewUserRequest>,
    api: web::Data<AuthApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ Received registration request for {request:?}");
    let user_id = api.register_user(request).await?;
    let response =
        NewUserResponse { user_id, message: "Account created. Please verify your email address to log in.".into() };
    Ok(HttpResponse::Ok().json(response))
}

route!(login => Post "/login" impl CredentialStore);
/// Checks the user's email and password and issues a `session` cookie.
///
/// The cookie's lifetime is the session's refresh window, not its maximum lifetime. Clients keep the session alive by
/// calling `/api/session/refresh`.
pub async fn login<B: CredentialStore>(
    body: web::Json<LoginRequest>,
    api: web::Data<AuthApi<B>>,
    sessions: web::Data<SessionStore>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let LoginRequest { email, password } = body.into_inner();
    trace!("💻️ Received login request");
    let user = api.authenticate(&email, &password).await?;
    match sessions.purge_expired_at(Utc::now()) {
        Ok(0) => {},
        Ok(n) => debug!("💻️ Purged {n} expired sessions"),
        Err(e) => warn!("💻️ Could not purge expired sessions. {e}"),
    }
    let cookie = sessions.create_session(user.user_id, user.role)?;
    let response =
        LoginResponse { user_id: user.user_id, email: user.email, role: user.role, session_expires_at: cookie.expires_at };
    Ok(HttpResponse::Ok().cookie(session_cookie(&cookie, options.secure_cookies)).json(response))
}

/// Revokes the caller's session, if it has one, and clears the cookie. Logging out twice is not an error.
#[post("/logout")]
pub async fn logout(req: HttpRequest, sessions: web::Data<SessionStore>) -> Result<HttpResponse, ServerError> {
    if let Some(token) = raw_session_token(&req) {
        match sessions.revoke(&token) {
            Ok(()) | Err(SessionError::SessionNotFound) => {},
            Err(e) => return Err(e.into()),
        }
    }
    trace!("💻️ Logged out");
    Ok(HttpResponse::Ok().cookie(removal_cookie()).json(JsonResponse::success("Logged out")))
}

#[post("/session/refresh")]
pub async fn refresh_session(
    user: AuthenticatedUser,
    sessions: web::Data<SessionStore>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let cookie = sessions.refresh(user.token())?;
    trace!("💻️ Refreshed session for user #{}", user.user_id());
    let response = SessionResponse { user_id: user.user_id(), role: user.0.role, session_expires_at: cookie.expires_at };
    Ok(HttpResponse::Ok().cookie(session_cookie(&cookie, options.secure_cookies)).json(response))
}

//----------------------------------------------   Balances  ----------------------------------------------------
route!(balances => Get "/balances" impl AccountManagement);
pub async fn balances<B: AccountManagement>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balances for user #{}", user.user_id());
    let balances = api.balances(user.user_id()).await?;
    Ok(HttpResponse::Ok().json(BalancesResponse::from(balances)))
}

route!(transactions => Get "/transactions" impl AccountManagement);
pub async fn transactions<B: AccountManagement>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET transactions for user #{}", user.user_id());
    let transactions = api.transactions(user.user_id()).await?;
    let result = transactions.into_iter().map(TransactionView::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Savings plans  ----------------------------------------------------
route!(family_vault_plans => Get "/family_vault" impl AccountManagement);
pub async fn family_vault_plans<B: AccountManagement>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = user.user_id();
    debug!("💻️ GET family vault plans for user #{user_id}");
    let plans = api.family_vault_plans(user_id).await?;
    let result = plans.into_iter().map(|p| FamilyVaultPlanView::for_user(p, user_id)).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(result))
}

route!(create_family_vault_plan => Post "/family_vault" impl AccountManagement);
pub async fn create_family_vault_plan<B: AccountManagement>(
    user: AuthenticatedUser,
    body: web::Json<NewSavingsPlan>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new family vault plan for user #{}", user.user_id());
    let plan_id = api.create_family_vault_plan(user.user_id(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(NewPlanResponse { plan_id }))
}

route!(add_family_vault_member => Post "/family_vault/{plan_id}/members" impl AccountManagement);
pub async fn add_family_vault_member<B: AccountManagement>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<NewMemberRequest>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let plan_id = path.into_inner();
    let new_member = body.user_id;
    debug!("💻️ POST add user #{new_member} to family vault plan #{plan_id}");
    api.add_family_vault_member(user.user_id(), plan_id, new_member).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("User #{new_member} added to plan #{plan_id}"))))
}

route!(target_savings_plans => Get "/target_savings" impl AccountManagement);
pub async fn target_savings_plans<B: AccountManagement>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET target savings plans for user #{}", user.user_id());
    let plans = api.target_savings_plans(user.user_id()).await?;
    let result = plans.into_iter().map(TargetSavingsPlanView::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(result))
}

route!(create_target_savings_plan => Post "/target_savings" impl AccountManagement);
pub async fn create_target_savings_plan<B: AccountManagement>(
    user: AuthenticatedUser,
    body: web::Json<NewSavingsPlan>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new target savings plan for user #{}", user.user_id());
    let plan_id = api.create_target_savings_plan(user.user_id(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(NewPlanResponse { plan_id }))
}

//----------------------------------------------   Funding intents  ----------------------------------------------------
route!(add_solo_savings_funds => Post "/solo_savings/add_funds" impl LedgerGateway);
pub async fn add_solo_savings_funds<B: LedgerGateway>(
    user: AuthenticatedUser,
    body: web::Json<AddFundsRequest>,
    api: web::Data<ReconciliationApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let AddFundsRequest { amount, reference } = body.into_inner();
    let reference = reference.unwrap_or_else(Reference::random);
    let tx = NewPendingTransaction::solo_savings(user.user_id(), reference, amount);
    open_funding_intent(api.as_ref(), tx, options.as_ref()).await
}

route!(add_family_vault_funds => Post "/family_vault/{plan_id}/add_funds" impl LedgerGateway);
pub async fn add_family_vault_funds<B: LedgerGateway>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<AddFundsRequest>,
    api: web::Data<ReconciliationApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let AddFundsRequest { amount, reference } = body.into_inner();
    let reference = reference.unwrap_or_else(Reference::random);
    let tx = NewPendingTransaction::family_savings(user.user_id(), path.into_inner(), reference, amount);
    open_funding_intent(api.as_ref(), tx, options.as_ref()).await
}

route!(add_target_savings_funds => Post "/target_savings/{plan_id}/add_funds" impl LedgerGateway);
pub async fn add_target_savings_funds<B: LedgerGateway>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<AddFundsRequest>,
    api: web::Data<ReconciliationApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let AddFundsRequest { amount, reference } = body.into_inner();
    let reference = reference.unwrap_or_else(Reference::random);
    let tx = NewPendingTransaction::target_savings(user.user_id(), path.into_inner(), reference, amount);
    open_funding_intent(api.as_ref(), tx, options.as_ref()).await
}

async fn open_funding_intent<B: LedgerGateway>(
    api: &ReconciliationApi<B>,
    tx: NewPendingTransaction,
    options: &ServerOptions,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST {} funding intent {} for user #{} ({})", tx.originator, tx.reference, tx.user_id, tx.amount);
    let record = api.record_pending_transaction(tx).await.map_err(|e| {
        debug!("💻️ Could not record funding intent. {e}");
        e
    })?;
    let response = FundingIntentResponse {
        reference: record.reference,
        originator: record.originator,
        plan_id: record.plan_id,
        amount: record.amount.into(),
        paystack_public_key: options.paystack_public_key.clone(),
    };
    Ok(HttpResponse::Ok().json(response))
}

//------------------------------------------   Payment processor webhook  ---------------------------------------------
route!(paystack_webhook => Post "/paystack-verification-webhook" impl LedgerGateway);
/// The payment processor's callback. It carries no session; it is authenticated by its HMAC signature over the raw
/// body, and optionally by the caller's IP address.
///
/// Anything the processor could not fix by resending gets a 200, so that it stops retrying. The exceptions are
/// signature failures (401), unparseable bodies (400) and an unreachable ledger (503). Replays are harmless because the
/// ledger only ever moves a transaction out of `PENDING` once.
pub async fn paystack_webhook<B: LedgerGateway>(
    req: HttpRequest,
    body: web::Bytes,
    options: web::Data<ServerOptions>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received payment webhook");
    if !is_whitelisted_peer(&req, options.as_ref()) {
        return Err(ServerError::ForbiddenPeer);
    }
    let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
    match api.handle_webhook(&body, signature).await {
        Ok(ack) => {
            info!("💻️ Payment webhook handled: {ack}");
            Ok(HttpResponse::Ok().json(WebhookResponse::from(&ack)))
        },
        Err(e) if e.is_retryable() => {
            error!("💻️ Payment webhook could not be applied. The processor will be asked to retry. {e}");
            Err(e.into())
        },
        Err(ReconciliationError::Webhook(e)) => Err(ServerError::WebhookRejected(e)),
        Err(e) => {
            error!("💻️ Payment webhook could not be applied, and retrying will not help. {e}");
            Ok(HttpResponse::Ok().json(JsonResponse::failure("The webhook was received but could not be applied")))
        },
    }
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(verify_user => Post "/admin/users/{id}/verify" impl CredentialStore);
pub async fn verify_user<B: CredentialStore>(
    admin: AdminUser,
    path: web::Path<i64>,
    api: web::Data<AuthApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    info!("💻️ Admin #{} is verifying the email address of user #{user_id}", admin.0.user_id);
    api.verify_email(user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("User #{user_id} verified"))))
}

route!(grant_admin => Post "/admin/users/{id}/grant_admin" impl CredentialStore);
pub async fn grant_admin<B: CredentialStore>(
    admin: AdminUser,
    path: web::Path<i64>,
    api: web::Data<AuthApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    info!("💻️ Admin #{} is granting the admin role to user #{user_id}", admin.0.user_id);
    api.grant_admin(user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("User #{user_id} is now an admin"))))
}

route!(admin_transaction => Get "/admin/transactions/{reference}" impl LedgerGateway);
pub async fn admin_transaction<B: LedgerGateway>(
    _admin: AdminUser,
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let reference = path.into_inner().parse::<Reference>().map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
    debug!("💻️ GET transaction {reference}");
    let tx = api
        .fetch_transaction(&reference)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No transaction with reference {reference}")))?;
    Ok(HttpResponse::Ok().json(TransactionView::from(tx)))
}
