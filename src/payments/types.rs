//! Payment gateway types and data structures
//!
//! Wire shapes for the gateway's pay/status APIs, plus the transaction model the
//! initiation, verification and callback paths share.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Redirect mode requested from the gateway: the payer comes back via server-side POST
pub const REDIRECT_MODE_POST: &str = "POST";

/// Payment instrument type for the gateway's hosted payment page
pub const PAY_PAGE_INSTRUMENT: &str = "PAY_PAGE";

/// Gateway-assigned transaction identifier
///
/// Only constructible from a non-blank string, so holding one means the transaction
/// has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as a single URL path segment
    ///
    /// Status lookups embed the id in the request path and sign that path, so only
    /// characters that need no percent-encoding are accepted.
    pub fn as_path_segment(&self) -> AppResult<&str> {
        if self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            Ok(&self.0)
        } else {
            Err(AppError::invalid_identifier("transactionId"))
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payment request from the merchant application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Amount in whole currency units (rupees)
    pub amount: i64,
    /// Merchant order id, becomes the gateway's merchant transaction id
    pub order_id: String,
    /// Payer phone number
    pub payer_phone: String,
}

impl TransactionRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.amount <= 0 {
            return Err(AppError::invalid_amount(format!(
                "must be greater than 0, got {}",
                self.amount
            )));
        }
        if self.order_id.trim().is_empty() {
            return Err(AppError::missing_field("orderId"));
        }
        if self.payer_phone.trim().is_empty() {
            return Err(AppError::missing_field("userDetails.phone"));
        }
        Ok(())
    }

    /// Amount in the gateway's minor unit (paise)
    pub fn amount_in_minor_units(&self) -> AppResult<u64> {
        u64::try_from(self.amount)
            .ok()
            .and_then(|amount| amount.checked_mul(100))
            .ok_or_else(|| AppError::invalid_amount(format!("{} is out of range", self.amount)))
    }
}

/// Canonical pay request; field order is the serialized order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub merchant_id: String,
    pub merchant_transaction_id: String,
    pub merchant_user_id: String,
    pub amount: u64,
    pub redirect_url: String,
    pub redirect_mode: String,
    pub callback_url: String,
    pub mobile_number: String,
    pub payment_instrument: PaymentInstrument,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentInstrument {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Base64 payload plus its `X-VERIFY` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub encoded_body: String,
    pub signature: String,
}

/// Body posted to the pay endpoint
#[derive(Debug, Serialize)]
pub struct PayRequestBody<'a> {
    pub request: &'a str,
}

/// Raw gateway reply envelope, shared by the pay and status APIs
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GatewayReply {
    pub success: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Interpreted reply of the pay API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResponse {
    Success { redirect_url: String },
    Failure { message: String },
}

/// Inbound asynchronous notification, merged from query string and body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackEnvelope {
    /// Base64 encoded JSON result
    pub encoded_response: Option<String>,
    pub booking_id: Option<String>,
    /// Flat transaction id sent alongside (or instead of) the encoded result
    pub raw_transaction_id: Option<String>,
    /// Flat response code (e.g. `PAYMENT_SUCCESS`) from form-posted redirects
    pub code: Option<String>,
}

/// Outcome of a transaction, keyed by the gateway transaction id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Completed {
        transaction_id: TransactionId,
    },
    Failed {
        transaction_id: TransactionId,
        message: Option<String>,
    },
    /// The gateway reported a non-terminal or unrecognised state, or none at all
    Unknown {
        transaction_id: TransactionId,
        state: Option<String>,
    },
}

impl TransactionOutcome {
    /// Map a gateway state (`data.state`) or response code (`code`) onto an outcome
    pub fn from_state(
        transaction_id: TransactionId,
        state: Option<&str>,
        message: Option<String>,
    ) -> Self {
        match state {
            Some("COMPLETED") | Some("PAYMENT_SUCCESS") => Self::Completed { transaction_id },
            Some("FAILED") | Some("PAYMENT_ERROR") | Some("PAYMENT_DECLINED")
            | Some("TIMED_OUT") => Self::Failed {
                transaction_id,
                message,
            },
            other => Self::Unknown {
                transaction_id,
                state: other.map(str::to_string),
            },
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        match self {
            Self::Completed { transaction_id }
            | Self::Failed { transaction_id, .. }
            | Self::Unknown { transaction_id, .. } => transaction_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Two-valued status reported to the merchant application
    pub fn status_label(&self) -> &'static str {
        if self.is_completed() {
            "COMPLETED"
        } else {
            "FAILED"
        }
    }
}
