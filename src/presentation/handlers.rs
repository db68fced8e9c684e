use crate::application::auth_service::AuthService;
use crate::application::customer_service::CustomerService;
use crate::application::dashboard_service::DashboardService;
use crate::application::ledger_service::LedgerService;
use crate::application::shop_book_service::ShopBookService;
use crate::data::memory::InMemoryLedgerRepository;
use crate::data::user_repository::InMemoryUserRepository;
use crate::domain::error::DomainError;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::uploads::DiskPhotoStore;
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpMessage, HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub struct AppState {
    pub customers: CustomerService<InMemoryLedgerRepository, DiskPhotoStore>,
    pub ledger: LedgerService<InMemoryLedgerRepository>,
    pub dashboard: DashboardService<InMemoryLedgerRepository, InMemoryUserRepository>,
    pub shop_book: ShopBookService<InMemoryLedgerRepository, InMemoryUserRepository>,
    pub auth_service: Arc<AuthService<InMemoryUserRepository>>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wires the in-memory stores and services from configuration.
    pub fn in_memory(config: &AppConfig) -> Self {
        let ledger_repository = Arc::new(InMemoryLedgerRepository::new());
        let user_repository = Arc::new(InMemoryUserRepository::new());
        let photos = Arc::new(DiskPhotoStore::new(config.upload_dir.clone()));

        Self {
            customers: CustomerService::new(
                ledger_repository.clone(),
                photos,
                config.write_retries,
            ),
            ledger: LedgerService::new(ledger_repository.clone(), config.write_retries),
            dashboard: DashboardService::new(ledger_repository.clone(), user_repository.clone()),
            shop_book: ShopBookService::new(ledger_repository, user_repository.clone()),
            auth_service: Arc::new(AuthService::new(
                user_repository,
                config.jwt_secret.clone(),
                config.token_ttl_secs,
            )),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

// Uniform error response format
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub details: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

const GENERIC_SERVER_ERROR: &str = "Server Error";

impl ResponseError for ShopError {
    fn status_code(&self) -> StatusCode {
        match self {
            ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ShopError::Conflict(_) => StatusCode::CONFLICT,
            ShopError::Database(_) | ShopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        let (error, message) = match self {
            ShopError::Validation(msg)
            | ShopError::NotFound(msg)
            | ShopError::Unauthorized(msg)
            | ShopError::Conflict(msg) => {
                warn!(error = %error_msg, status = %status, "Request rejected");
                (error_msg.clone(), msg.clone())
            }
            // Details stay in the log; clients get a generic message.
            ShopError::Database(_) | ShopError::Internal(_) => {
                error!(error = %error_msg, status = %status, "Request failed");
                (
                    GENERIC_SERVER_ERROR.to_string(),
                    GENERIC_SERVER_ERROR.to_string(),
                )
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error,
            details: serde_json::json!({ "message": message }),
        })
    }
}

impl From<anyhow::Error> for ShopError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::Validation(msg)) => ShopError::Validation(msg.clone()),
            Some(DomainError::NotFound(msg)) => ShopError::NotFound(msg.clone()),
            Some(DomainError::Unauthorized(msg)) => ShopError::Unauthorized(msg.clone()),
            Some(DomainError::Conflict(msg)) => ShopError::Conflict(msg.clone()),
            Some(DomainError::Internal(msg)) => ShopError::Internal(msg.clone()),
            None => ShopError::Database(format!("{err:#}")),
        }
    }
}

impl From<DomainError> for ShopError {
    fn from(err: DomainError) -> Self {
        ShopError::from(anyhow::Error::from(err))
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ShopError;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>().cloned();
        Box::pin(async move {
            user.ok_or_else(|| ShopError::Unauthorized("User not authenticated".to_string()))
        })
    }
}

/// Malformed bodies, including negative amounts, surface as validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ShopError::Validation(err.to_string()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        ShopError::Validation(err.to_string()).into()
    })
}

/// An id that is not a UUID cannot name an existing record.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| ShopError::NotFound("Resource not found".to_string()).into())
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    info!("Health check requested");
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
