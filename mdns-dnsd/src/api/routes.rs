use std::collections::BTreeMap;
use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use shared::types::ServiceEntry;
use crate::directory::Directory;

#[derive(Clone)]
pub struct AppState {
    pub directory: Directory,
    pub info: Arc<ConfigResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub domain: String,
    pub filter: String,
    pub service_type: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/config", get(get_config))
        .route("/v1/hosts", get(get_hosts))
        .route("/v1/hosts/hash", get(get_hash))
        .route("/v1/hosts/:name", get(get_host))
        .with_state(state)
}

async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(state.info.as_ref().clone())
}

/// Sorted by name so output is stable between calls
async fn get_hosts(State(state): State<AppState>) -> Json<BTreeMap<String, ServiceEntry>> {
    Json(state.directory.snapshot().into_iter().collect())
}

async fn get_hash(State(state): State<AppState>) -> String {
    state.directory.fingerprint()
}

/// Accepts the name with or without the trailing dot
async fn get_host(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ServiceEntry>, StatusCode> {
    let name = if name.ends_with('.') { name } else { format!("{}.", name) };
    state
        .directory
        .lookup(&name)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
