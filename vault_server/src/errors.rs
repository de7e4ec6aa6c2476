use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use thiserror::Error;
use vault_engine::{
    webhook::WebhookError,
    AccountApiError,
    AuthApiError,
    LedgerError,
    ReconciliationError,
    SessionError,
};

use crate::session::removal_cookie;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Session error. {0}")]
    Session(#[from] SessionError),
    #[error("Invalid email address or password")]
    InvalidCredentials,
    #[error("Please verify your email address before logging in")]
    EmailNotVerified,
    #[error("Conflict. {0}")]
    Conflict(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Webhook rejected. {0}")]
    WebhookRejected(WebhookError),
    #[error("The ledger is temporarily unavailable. {0}")]
    LedgerUnavailable(String),
    #[error("Requests from this address are not allowed")]
    ForbiddenPeer,
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::Session(e) => match e {
                SessionError::SessionNotFound | SessionError::SessionExpired | SessionError::SessionRevoked => {
                    StatusCode::UNAUTHORIZED
                },
                SessionError::Forbidden(_) => StatusCode::FORBIDDEN,
                SessionError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EmailNotVerified => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::WebhookRejected(e) => match e {
                WebhookError::MissingSignature | WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
                WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            },
            Self::LedgerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ForbiddenPeer => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(ContentType::json());
        // Anything that means "log in again" also tells the browser to drop its cookie
        if matches!(self, Self::Session(e) if e.requires_reauthentication()) {
            response.cookie(removal_cookie());
        }
        response.body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::AccountDoesNotExist | AuthApiError::PasswordIncorrect => Self::InvalidCredentials,
            AuthApiError::EmailNotVerified => Self::EmailNotVerified,
            AuthApiError::EmailAlreadyRegistered => Self::Conflict(e.to_string()),
            AuthApiError::InvalidRegistration(_) => Self::InvalidRequestBody(e.to_string()),
            AuthApiError::UserNotFound(_) => Self::NoRecordFound(e.to_string()),
            AuthApiError::DatabaseError(_) | AuthApiError::PasswordHashError(_) => {
                error!("💻️ Authentication backend failure. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::PlanNotFound(_) | AccountApiError::UserNotFound(_) => Self::NoRecordFound(e.to_string()),
            AccountApiError::InvalidPlan(_) => Self::InvalidRequestBody(e.to_string()),
            AccountApiError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DuplicateReference(_) => Self::Conflict(e.to_string()),
            LedgerError::PlanNotFound { .. } => Self::NoRecordFound(e.to_string()),
            LedgerError::InvalidTransaction(_) | LedgerError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::Webhook(w) => Self::WebhookRejected(w),
            ReconciliationError::InvalidAmount => Self::InvalidRequestBody(e.to_string()),
            ReconciliationError::Ledger(LedgerError::DatabaseError(s)) => Self::LedgerUnavailable(s),
            ReconciliationError::Ledger(l) => l.into(),
        }
    }
}
