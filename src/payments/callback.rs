//! Asynchronous payment callback handling
//!
//! The gateway reports the result of a hosted-page payment either as a base64 encoded
//! JSON document in `response`, as a flat `transactionId` field, or both. The
//! transaction id is resolved in a fixed order:
//!
//! 1. `data.transactionId` inside the decoded `response`
//! 2. the flat `transactionId` field
//!
//! A malformed `response` is a decode failure and stops resolution. Once an id and a
//! booking id are known the payer is redirected to the booking-success page.

use crate::config::Config;
use crate::error::{AppError, AppResult, DecodeError};
use crate::payments::types::{CallbackEnvelope, TransactionId, TransactionOutcome};
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Route the gateway calls back on; also embedded in the pay request
pub const CALLBACK_PATH: &str = "/payment-tpfc/api/phonepe/callback";

/// Where a transaction id was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    EncodedResponse,
    FlatField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    pub transaction_id: TransactionId,
    pub source: IdSource,
    /// `data.state` or `code` reported alongside the id, if any
    pub reported_state: Option<String>,
}

/// A fully resolved callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResolution {
    pub outcome: TransactionOutcome,
    pub booking_id: String,
    pub redirect_url: String,
}

pub struct CallbackHandler {
    booking_success_url: Url,
}

impl CallbackHandler {
    pub fn new(config: &Config) -> AppResult<Self> {
        let booking_success_url = Url::parse(&config.redirect.booking_success_url)
            .map_err(|e| AppError::internal(format!("Invalid booking success URL: {}", e)))?;
        Ok(Self {
            booking_success_url,
        })
    }

    #[instrument(skip_all, fields(booking_id = ?envelope.booking_id))]
    pub fn handle(&self, envelope: &CallbackEnvelope) -> AppResult<CallbackResolution> {
        let resolved = resolve_transaction_id(envelope)?;

        let resolved = resolved.ok_or_else(|| AppError::missing_field("transactionId"))?;
        let booking_id = envelope
            .booking_id
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::missing_field("bookingId"))?
            .to_string();

        debug!("Transaction id resolved from {:?}", resolved.source);

        let outcome = TransactionOutcome::from_state(
            resolved.transaction_id,
            resolved.reported_state.as_deref(),
            None,
        );
        let redirect_url = self.redirect_url(outcome.transaction_id(), &booking_id);

        info!(
            "Payment callback: transaction_id={} booking_id={} outcome={:?}",
            outcome.transaction_id(),
            booking_id,
            outcome
        );

        Ok(CallbackResolution {
            outcome,
            booking_id,
            redirect_url,
        })
    }

    pub fn redirect_url(&self, transaction_id: &TransactionId, booking_id: &str) -> String {
        let mut url = self.booking_success_url.clone();
        url.query_pairs_mut()
            .append_pair("transactionId", transaction_id.as_str())
            .append_pair("bookingId", booking_id);
        url.to_string()
    }
}

/// Apply the resolution order to `envelope`
///
/// `Ok(None)` means neither source carried an id.
pub fn resolve_transaction_id(envelope: &CallbackEnvelope) -> AppResult<Option<ResolvedId>> {
    let mut reported_state = envelope.code.clone();

    if let Some(encoded) = non_blank(envelope.encoded_response.as_deref()) {
        let decoded = decode_response(encoded)?;

        if let Some(state) = decoded
            .pointer("/data/state")
            .or_else(|| decoded.get("code"))
            .and_then(Value::as_str)
        {
            reported_state = Some(state.to_string());
        }

        let nested = decoded
            .pointer("/data/transactionId")
            .and_then(Value::as_str)
            .and_then(TransactionId::new);

        if let Some(transaction_id) = nested {
            return Ok(Some(ResolvedId {
                transaction_id,
                source: IdSource::EncodedResponse,
                reported_state,
            }));
        }
    }

    Ok(non_blank(envelope.raw_transaction_id.as_deref())
        .and_then(TransactionId::new)
        .map(|transaction_id| ResolvedId {
            transaction_id,
            source: IdSource::FlatField,
            reported_state,
        }))
}

/// Base64 decode and parse the gateway's `response` field
pub fn decode_response(encoded: &str) -> AppResult<Value> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let text = String::from_utf8(bytes)?;
    serde_json::from_str(&text).map_err(|e| {
        DecodeError::Json {
            message: e.to_string(),
        }
        .into()
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
