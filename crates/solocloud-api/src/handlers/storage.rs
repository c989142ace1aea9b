//! Storage provider catalogue and connection testing.

use crate::auth::Owner;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use solocloud_core::{ProviderConfig, StorageProvider};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub id: StorageProvider,
    pub name: &'static str,
    pub active: bool,
    pub configured: bool,
    pub required_fields: &'static [&'static str],
    pub optional_fields: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub active: String,
    pub providers: Vec<ProviderInfo>,
}

#[derive(Debug, Deserialize)]
pub struct TestConnectionRequest {
    pub provider: String,
    /// Candidate credentials. When absent, the currently saved ones are tested.
    pub config: Option<ProviderConfig>,
}

pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    Owner(_): Owner,
) -> impl IntoResponse {
    let settings = state.settings.snapshot();
    let configured = state.registry.list_configured_providers(&settings);

    let providers = StorageProvider::ALL
        .into_iter()
        .map(|provider| ProviderInfo {
            id: provider,
            name: provider.display_name(),
            active: provider.as_str() == settings.active_id(),
            configured: configured.contains(&provider),
            required_fields: provider.required_fields(),
            optional_fields: provider.optional_fields(),
        })
        .collect();

    Json(ProvidersResponse {
        active: settings.active_id().to_string(),
        providers,
    })
}

pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Owner(owner_id): Owner,
    ValidatedJson(request): ValidatedJson<TestConnectionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let config = match request.config {
        Some(config) => config,
        None => request
            .provider
            .parse::<StorageProvider>()
            .map(|provider| state.settings.snapshot().provider_config(provider))
            .unwrap_or_default(),
    };

    let report = state
        .registry
        .test_connection(&request.provider, config)
        .await;
    tracing::info!(
        owner_id = %owner_id,
        provider = %request.provider,
        ok = report.ok,
        "Storage connection tested"
    );
    Ok(Json(report))
}
