use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub provider: Option<String>,
}

/// Model catalog endpoint.
///
/// With `?provider=` the live catalog is preferred; a catalog failure is
/// relayed as `{error, code}` with HTTP 200 so the UI can show it inline
/// instead of treating the request as failed. Without a provider, every
/// registered backend is listed, degrading to its static list on failure.
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(provider_id) = query.provider {
        let provider = state
            .registry
            .get(&provider_id)
            .ok_or(ApiError::InvalidProvider)?;

        return Ok(match provider.list_models().await {
            Some(Ok(models)) => Json(json!({ "models": models })),
            Some(Err(failure)) => Json(json!({ "error": failure.error, "code": failure.code })),
            None => Json(json!({ "models": provider.static_models() })),
        });
    }

    let mut providers = BTreeMap::new();
    for provider in state.registry.all() {
        let models = match provider.list_models().await {
            Some(Ok(models)) => models,
            Some(Err(failure)) => {
                tracing::warn!(
                    provider = provider.id(),
                    code = failure.code,
                    "model catalog failed: {}; using static list",
                    failure.error
                );
                provider.static_models()
            }
            None => provider.static_models(),
        };
        providers.insert(provider.id().to_string(), models);
    }

    Ok(Json(json!({ "providers": providers })))
}
