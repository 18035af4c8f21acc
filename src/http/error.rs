//! HTTP-facing error type
//!
//! Every handler returns `Result<_, AppError>`; the response body is always
//! `{"error": message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::ai::ChatError;
use crate::export::ExportError;
use crate::import::ImportError;
use crate::store::supabase::SupabaseError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to API clients
    fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Validation(msg)
            | AppError::Unavailable(msg) => msg.clone(),
            AppError::RateLimited => "Too many requests, please try again later".to_string(),
            AppError::Upstream(_) => "An upstream service failed to respond".to_string(),
            AppError::Internal(_) => "An unexpected error occurred".to_string(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::Internal(_) | AppError::Upstream(_)) {
            error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.public_message()
        });

        (self.status(), Json(body)).into_response()
    }
}

impl From<SupabaseError> for AppError {
    fn from(err: SupabaseError) -> Self {
        let decoded = err.postgrest_error().unwrap_or_default();
        let code = decoded.code.as_deref().unwrap_or("");
        let message = decoded
            .message
            .clone()
            .unwrap_or_else(|| "Database request failed".to_string());

        match (err.status(), code) {
            (_, "23505") | (Some(409), _) => AppError::Conflict(
                decoded
                    .details
                    .unwrap_or_else(|| "A record with these values already exists".to_string()),
            ),
            (_, "PGRST116") | (Some(404), _) | (Some(406), _) => {
                AppError::NotFound("Record not found".to_string())
            }
            (_, "P0001") => AppError::BadRequest(message),
            (_, c) if c.starts_with("22") || c.starts_with("23") => AppError::BadRequest(message),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .errors()
            .iter()
            .map(|(field, kind)| {
                let detail = match kind {
                    ValidationErrorsKind::Field(errs) => errs
                        .iter()
                        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .unwrap_or_else(|| "is invalid".to_string()),
                    ValidationErrorsKind::Struct(_) | ValidationErrorsKind::List(_) => {
                        "contains invalid entries".to_string()
                    }
                };
                format!("{} {}", field, detail)
            })
            .collect();
        messages.sort();

        if messages.is_empty() {
            AppError::Validation("Invalid request".to_string())
        } else {
            AppError::Validation(messages.join("; "))
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Unavailable => {
                AppError::Unavailable("The AI assistant is not configured".to_string())
            }
            ChatError::InvalidContent(msg) => AppError::Validation(msg),
            ChatError::Store(e) => e.into(),
            err @ ChatError::Model { .. } => AppError::Upstream(err.to_string()),
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnknownKind(_) => AppError::NotFound(err.to_string()),
            ExportError::Store(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, body: &str) -> SupabaseError {
        SupabaseError::Api {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err: AppError = api(
            409,
            r#"{"code":"23505","message":"duplicate key","details":"Key (sku) already exists."}"#,
        )
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.public_message().contains("sku"));
    }

    #[test]
    fn raised_exception_maps_to_bad_request() {
        let err: AppError = api(400, r#"{"code":"P0001","message":"Insufficient stock for SKU-1"}"#).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Insufficient stock for SKU-1");
    }

    #[test]
    fn single_row_miss_maps_to_not_found() {
        let err: AppError = api(406, r#"{"code":"PGRST116","message":"JSON object requested"}"#).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unknown_failures_hide_details() {
        let err: AppError = api(500, "connection reset by peer").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "An unexpected error occurred");
    }

    #[test]
    fn chat_errors_map_to_gateway_statuses() {
        let unavailable: AppError = ChatError::Unavailable.into();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        let failed: AppError = ChatError::Model {
            conversation_id: uuid::Uuid::new_v4(),
            source: crate::ai::model::ModelError::EmptyResponse,
        }
        .into();
        assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);

        let empty: AppError = ChatError::InvalidContent("Message cannot be empty".to_string()).into();
        assert_eq!(empty.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn import_problems_are_client_errors() {
        let err: AppError = ImportError::MissingColumns(vec!["sku".to_string()]).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Missing required columns: sku");
    }
}
