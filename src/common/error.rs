// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Erros de domínio + infraestrutura. Os handlers traduzem via `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("One or more fields are invalid")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    CapacityExceeded(String),

    #[error("{0} not found")]
    ResourceNotFound(String),

    #[error("This invitation is invalid or has already been used")]
    InvalidInvite,

    #[error("External service failure: {0}")]
    ExternalService(String),

    #[error("Contractor access expired on {0}")]
    ContractorAccessExpired(NaiveDate),

    #[error("You are not associated with any organization")]
    NoOrganization,

    #[error("This email is already in use")]
    EmailAlreadyExists,

    #[error("This organization domain is already taken")]
    DomainAlreadyExists,

    #[error("{0} is still referenced and cannot be deleted")]
    ResourceInUse(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or missing authentication token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    // Variante para erros de banco de dados
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro já pronto para a resposta HTTP (mensagem traduzida)
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Authorization(_) | AppError::NoOrganization => StatusCode::FORBIDDEN,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::CapacityExceeded(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::ResourceNotFound(_) | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidInvite => StatusCode::GONE,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::ContractorAccessExpired(_)
            | AppError::InvalidCredentials
            | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::EmailAlreadyExists
            | AppError::DomainAlreadyExists
            | AppError::ResourceInUse(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave da mensagem no catálogo de traduções.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "errors.validation",
            AppError::InvalidInput(_) => "errors.invalid_input",
            AppError::Authorization(_) => "errors.authorization",
            AppError::InvalidTransition(_) => "errors.invalid_transition",
            AppError::CapacityExceeded(_) => "errors.capacity_exceeded",
            AppError::ResourceNotFound(_) => "errors.not_found",
            AppError::InvalidInvite => "errors.invalid_invite",
            AppError::ExternalService(_) => "errors.external_service",
            AppError::ContractorAccessExpired(_) => "errors.contractor_expired",
            AppError::NoOrganization => "errors.no_organization",
            AppError::EmailAlreadyExists => "errors.email_exists",
            AppError::DomainAlreadyExists => "errors.domain_exists",
            AppError::ResourceInUse(_) => "errors.resource_in_use",
            AppError::InvalidCredentials => "errors.invalid_credentials",
            AppError::InvalidToken => "errors.invalid_token",
            AppError::UserNotFound => "errors.user_not_found",
            _ => "errors.internal",
        }
    }

    // Texto livre que entra no placeholder `{detail}` da mensagem traduzida
    fn detail(&self) -> Option<String> {
        match self {
            AppError::InvalidInput(msg)
            | AppError::Authorization(msg)
            | AppError::InvalidTransition(msg)
            | AppError::CapacityExceeded(msg)
            | AppError::ResourceNotFound(msg)
            | AppError::ExternalService(msg)
            | AppError::ResourceInUse(msg) => Some(msg.clone()),
            AppError::ContractorAccessExpired(date) => Some(date.format("%d %b %Y").to_string()),
            _ => None,
        }
    }

    fn validation_details(&self) -> Option<Value> {
        let AppError::ValidationError(errors) = self else {
            return None;
        };

        let mut details = std::collections::HashMap::new();
        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            details.insert(field.to_string(), messages);
        }
        Some(json!(details))
    }

    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status_code();

        // Erros 500 são logados com o detalhe e devolvidos genéricos
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal server error: {}", self);
        }

        let error = store.translate(&locale.0, self.message_key(), self.detail().as_deref());

        ApiError {
            status,
            error,
            details: self.validation_details(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Usado pelos middlewares, que não têm o Locale em mãos.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal server error: {}", self);
            "An unexpected error occurred.".to_string()
        } else {
            self.to_string()
        };

        ApiError {
            status,
            error,
            details: self.validation_details(),
        }
        .into_response()
    }
}
