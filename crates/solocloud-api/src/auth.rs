//! Caller identity.
//!
//! Sessions and login live in front of this service; by the time a request reaches us the
//! session layer has put the caller's id in the `x-user-id` header.

use crate::constants::USER_ID_HEADER;
use crate::error::HttpAppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use solocloud_core::AppError;
use uuid::Uuid;

/// The user on whose behalf the request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub Uuid);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers.get(USER_ID_HEADER).ok_or_else(|| {
            AppError::Unauthorized(format!("Missing {} header", USER_ID_HEADER))
        })?;

        let owner_id = value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER)))?;

        Ok(Owner(owner_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Owner, HttpAppError> {
        let mut builder = Request::builder().uri("/api/files");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Owner::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn accepts_uuid_header() {
        let id = Uuid::new_v4();
        assert_eq!(extract(Some(&id.to_string())).await.unwrap(), Owner(id));
    }

    #[tokio::test]
    async fn rejects_missing_or_malformed_header() {
        assert!(matches!(
            extract(None).await,
            Err(HttpAppError(AppError::Unauthorized(_)))
        ));
        assert!(matches!(
            extract(Some("alice")).await,
            Err(HttpAppError(AppError::Unauthorized(_)))
        ));
    }
}
