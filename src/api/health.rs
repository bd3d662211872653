use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::payments::providers::phonepe::PROVIDER;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub gateway: String,
    pub merchant_configured: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let gateway = &state.config.gateway;
    let merchant_configured = !gateway.merchant_id.is_empty()
        && !gateway.salt_key.is_empty()
        && !gateway.salt_index.is_empty();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.server.environment.clone(),
        gateway: PROVIDER.to_string(),
        merchant_configured,
    })
}
