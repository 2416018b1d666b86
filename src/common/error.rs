// src/common/error.rs

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    // Item do carrinho apontando para um remédio inexistente
    #[error("Medicine {0} not found")]
    UnknownMedicine(Uuid),

    #[error("Insufficient stock for {name} (batch {batch_number}): available {available} strips, requested {requested}")]
    InsufficientStock {
        name: String,
        batch_number: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Medicine {name} with batch {batch_number} already exists")]
    DuplicateBatch { name: String, batch_number: String },

    #[error("{0} cannot be changed after creation")]
    ImmutableField(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Invalid or missing authentication token.")]
    InvalidToken,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("PDF error: {0}")]
    PdfError(#[from] genpdf::error::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::UnknownMedicine(_)
            | AppError::InsufficientStock { .. }
            | AppError::DuplicateBatch { .. }
            | AppError::ImmutableField(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Rejeições do axum viram o mesmo corpo `{error}` das demais falhas
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Validação: devolve os detalhes por campo
        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(m) => m.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "One or more fields are invalid.",
                "details": details,
            }));
            return (status, body).into_response();
        }

        let message = if status.is_server_error() {
            // O detalhe fica só no log
            tracing::error!("Internal server error: {}", self);
            "An unexpected error occurred.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_bad_request() {
        let err = AppError::InsufficientStock {
            name: "Paracetamol".into(),
            batch_number: "B1".into(),
            available: Decimal::new(1, 0),
            requested: Decimal::new(2, 0),
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Paracetamol (batch B1): available 1 strips, requested 2"
        );
        assert_eq!(AppError::ImmutableField("tabletsPerStrip").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::UnknownMedicine(Uuid::nil()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn lookup_and_auth_errors() {
        assert_eq!(AppError::NotFound("Medicine").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotFound("Bill").to_string(), "Bill not found");
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unexpected_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("connection reset"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
