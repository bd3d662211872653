pub mod health;
pub mod payments;

use axum::{
    extract::Request,
    http::HeaderValue,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{info_span, warn, Level};

use crate::config::Config;
use crate::error::AppResult;
use crate::payments::callback::CALLBACK_PATH;
use crate::payments::{CallbackHandler, PaymentGateway, StatusVerifier, TransactionInitiator};

pub const INITIATE_PATH: &str = "/api/phonepe/initiate";
pub const VERIFY_PATH: &str = "/payment-tpfc/api/phonepe/verify";

/// Shared, immutable per-process state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub initiator: Arc<TransactionInitiator>,
    pub verifier: Arc<StatusVerifier>,
    pub callback: Arc<CallbackHandler>,
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<dyn PaymentGateway>) -> AppResult<Self> {
        Ok(Self {
            initiator: Arc::new(TransactionInitiator::new(&config, gateway.clone())?),
            verifier: Arc::new(StatusVerifier::new(&config, gateway)),
            callback: Arc::new(CallbackHandler::new(&config)?),
            config: Arc::new(config),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id,
            )
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health::health_check))
        .route(INITIATE_PATH, post(payments::initiate_payment))
        .route(VERIFY_PATH, any(payments::verify_payment))
        .route(CALLBACK_PATH, any(payments::payment_callback))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
