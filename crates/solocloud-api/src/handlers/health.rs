//! Health check.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
    Timeout,
}

impl CheckStatus {
    fn is_healthy(&self) -> bool {
        matches!(self, CheckStatus::Healthy)
    }
}

/// Bound `check` by `timeout`; failures and timeouts are reported, not propagated.
async fn probe<F, E>(timeout: Duration, check: F) -> CheckStatus
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, check).await {
        Ok(Ok(())) => CheckStatus::Healthy,
        Ok(Err(e)) => CheckStatus::Unhealthy(e.to_string()),
        Err(_) => CheckStatus::Timeout,
    }
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub catalog: CheckStatus,
    pub storage: CheckStatus,
    pub active_provider: String,
}

/// Catalog reachability decides the status code. An unusable storage provider only
/// degrades the report, since reads and shares of existing files still work.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.catalog.clone();
    let catalog_status = probe(CHECK_TIMEOUT, async move {
        catalog.get(Uuid::nil()).await.map(drop)
    })
    .await;

    let settings = state.settings.snapshot();
    let storage_status = match state.registry.active(&settings) {
        Ok(_) => CheckStatus::Healthy,
        Err(e) => CheckStatus::Degraded(e.to_string()),
    };

    let healthy = catalog_status.is_healthy();
    if !healthy {
        tracing::warn!(catalog = ?catalog_status, "Health check failed");
    }

    let response = HealthCheckResponse {
        healthy,
        version: env!("CARGO_PKG_VERSION"),
        catalog: catalog_status,
        storage: storage_status,
        active_provider: settings.active_id().to_string(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_reports_errors_and_timeouts() {
        assert_eq!(
            probe(CHECK_TIMEOUT, async { Ok::<(), String>(()) }).await,
            CheckStatus::Healthy
        );
        assert_eq!(
            probe(CHECK_TIMEOUT, async { Err::<(), _>("pool closed") }).await,
            CheckStatus::Unhealthy("pool closed".to_string())
        );
        let slow = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<(), String>(())
        };
        assert_eq!(
            probe(Duration::from_millis(10), slow).await,
            CheckStatus::Timeout
        );
    }

    #[test]
    fn statuses_serialize_with_detail() {
        let json = serde_json::to_value(CheckStatus::Degraded("qiniu incomplete".into())).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["detail"], "qiniu incomplete");
        assert_eq!(serde_json::to_value(CheckStatus::Healthy).unwrap()["status"], "healthy");
    }
}
