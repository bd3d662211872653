//! HTTP handlers for payment initiation, status verification and gateway callbacks
//!
//! Handlers translate between the wire format the merchant front-end and the gateway
//! expect and the payment core. Every [`AppError`] is turned into a response here.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, Query, Request, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::api::AppState;
use crate::error::{AppError, AppResult, DecodeError};
use crate::payments::types::{
    CallbackEnvelope, GatewayResponse, TransactionId, TransactionOutcome, TransactionRequest,
};
use crate::payments::verifier::StatusReport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub amount: i64,
    pub order_id: String,
    pub user_details: UserDetails,
}

#[derive(Debug, Deserialize)]
pub struct UserDetails {
    pub phone: String,
}

impl From<InitiatePaymentRequest> for TransactionRequest {
    fn from(request: InitiatePaymentRequest) -> Self {
        Self {
            amount: request.amount,
            order_id: request.order_id,
            payer_phone: request.user_details.phone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuery {
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Callback fields as they may appear in the query string or the body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackFields {
    pub response: Option<String>,
    pub transaction_id: Option<String>,
    pub booking_id: Option<String>,
    pub code: Option<String>,
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    payload: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(request)) => state.initiator.initiate(&request.into()).await,
        Err(rejection) => Err(AppError::malformed_body(rejection.body_text())),
    };

    match result {
        Ok(GatewayResponse::Success { redirect_url }) => Json(InitiatePaymentResponse {
            success: true,
            redirect_url: Some(redirect_url),
            error: None,
        })
        .into_response(),
        Ok(GatewayResponse::Failure { message }) => Json(InitiatePaymentResponse {
            success: false,
            redirect_url: None,
            error: Some(message),
        })
        .into_response(),
        Err(e) => {
            log_failure("initiate", &e);
            (
                e.status_code(),
                Json(InitiatePaymentResponse {
                    success: false,
                    redirect_url: None,
                    error: Some(e.public_message()),
                }),
            )
                .into_response()
        }
    }
}

pub async fn verify_payment(
    State(state): State<AppState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Response {
    let result = match query {
        Ok(Query(query)) => match query.transaction_id.and_then(TransactionId::new) {
            Some(transaction_id) => state.verifier.verify(transaction_id).await,
            None => Err(AppError::missing_field("transactionId")),
        },
        Err(rejection) => Err(AppError::malformed_query(rejection.body_text())),
    };

    let body = match result {
        Ok(StatusReport::Reported(outcome)) => VerifyPaymentResponse {
            success: true,
            status: Some(outcome.status_label().to_string()),
            message: match &outcome {
                TransactionOutcome::Unknown { state, .. } => Some(format!(
                    "Payment state is {}",
                    state.as_deref().unwrap_or("unknown")
                )),
                _ => None,
            },
        },
        Ok(StatusReport::Rejected { message, .. }) => VerifyPaymentResponse {
            success: false,
            status: Some("FAILED".to_string()),
            message,
        },
        Err(e) => {
            log_failure("verify", &e);
            return (
                e.status_code(),
                Json(VerifyPaymentResponse {
                    success: false,
                    status: None,
                    message: Some(e.public_message()),
                }),
            )
                .into_response();
        }
    };

    Json(body).into_response()
}

/// Gateway callback; accepts any method and either JSON or form bodies
pub async fn payment_callback(State(state): State<AppState>, request: Request) -> Response {
    let result = match read_callback_envelope(request).await {
        Ok(envelope) => state.callback.handle(&envelope),
        Err(e) => Err(e),
    };

    match result {
        Ok(resolution) => Redirect::to(&resolution.redirect_url).into_response(),
        Err(e) => {
            log_failure("callback", &e);
            (e.status_code(), e.public_message()).into_response()
        }
    }
}

/// Merge callback fields from the query string and the body, body first
async fn read_callback_envelope(request: Request) -> AppResult<CallbackEnvelope> {
    let from_query = Query::<CallbackFields>::try_from_uri(request.uri())
        .map(|Query(fields)| fields)
        .map_err(|e| AppError::malformed_body(e.body_text()))?;

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let from_body = if content_type.starts_with("application/json") {
        Json::<CallbackFields>::from_request(request, &())
            .await
            .map(|Json(fields)| fields)
            .map_err(|e| {
                AppError::from(DecodeError::Json {
                    message: e.body_text(),
                })
            })?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        Form::<CallbackFields>::from_request(request, &())
            .await
            .map(|Form(fields)| fields)
            .map_err(|e| {
                AppError::from(DecodeError::Form {
                    message: e.body_text(),
                })
            })?
    } else {
        CallbackFields::default()
    };

    Ok(CallbackEnvelope {
        encoded_response: from_body.response.or(from_query.response),
        booking_id: from_body.booking_id.or(from_query.booking_id),
        raw_transaction_id: from_body.transaction_id.or(from_query.transaction_id),
        code: from_body.code.or(from_query.code),
    })
}

fn log_failure(operation: &str, e: &AppError) {
    if e.status_code() == StatusCode::BAD_REQUEST {
        warn!("{} rejected: {}", operation, e);
    } else {
        error!("{} failed: {}", operation, e);
    }
}
