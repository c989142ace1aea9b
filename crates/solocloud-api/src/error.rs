//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>` and use `?` on anything that
//! converts into `AppError`, so every failure renders with the same status, body and logging.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use solocloud_core::{AppError, ErrorMetadata, LogLevel};

/// JSON body of every non-2xx API response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Variant name and cause chain; omitted in production and for sensitive errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            recoverable: false,
            suggested_action: None,
            error_type: None,
            details: None,
        }
    }

    fn from_app_error(err: &AppError, expose_details: bool) -> Self {
        let expose = expose_details && !err.is_sensitive();
        Self {
            error: err.client_message(),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(str::to_string),
            error_type: expose.then(|| err.error_type().to_string()),
            details: expose.then(|| err.detailed_message()),
        }
    }
}

/// Newtype so handlers can `?` anything convertible into `AppError`.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl<E> From<E> for HttpAppError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        HttpAppError(err.into())
    }
}

fn rejection_error(rejection: JsonRejection) -> AppError {
    AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
}

/// `Json<T>` whose rejection renders as an [`ErrorResponse`] rather than axum's plain text.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(inner)| ValidatedJson(inner))
            .map_err(|rejection| HttpAppError(rejection_error(rejection)))
    }
}

fn log_error(err: &AppError, status: StatusCode) {
    let code = err.error_code();
    let status = status.as_u16();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error = %err, code, status, "Request failed"),
        LogLevel::Warn => tracing::warn!(error = %err, code, status, "Request failed"),
        LogLevel::Error => {
            tracing::error!(error = %err.detailed_message(), code, status, "Request failed")
        }
    }
}

fn is_production_env() -> bool {
    ["ENVIRONMENT", "APP_ENV"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .map(|env| matches!(env.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        log_error(&self.0, status);

        let body = ErrorResponse::from_app_error(&self.0, !is_production_env());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solocloud_storage::StorageError;

    #[test]
    fn storage_errors_map_through_app_error() {
        let err = HttpAppError::from(StorageError::UnknownProvider("dropbox".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = HttpAppError::from(StorageError::UploadFailed("HTTP 500".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn sensitive_errors_hide_details() {
        let body = ErrorResponse::from_app_error(&AppError::Internal("db password wrong".into()), true);
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());

        let body = ErrorResponse::from_app_error(&AppError::Validation("empty name".into()), true);
        assert_eq!(body.error_type.as_deref(), Some("Validation"));
        assert!(body.details.is_some());

        let body = ErrorResponse::from_app_error(&AppError::Validation("empty name".into()), false);
        assert!(body.details.is_none());
    }

    #[test]
    fn configuration_errors_are_conflicts() {
        let err = HttpAppError(AppError::Configuration("qiniu incomplete".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
