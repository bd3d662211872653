//! Payment initiation
//!
//! Builds the canonical pay request, base64-encodes and signs it, submits it through
//! the gateway and reduces the reply to either a hosted-page redirect URL or the
//! gateway's failure message.

use crate::config::Config;
use crate::error::{AppError, AppResult, ExternalError};
use crate::payments::callback::CALLBACK_PATH;
use crate::payments::providers::phonepe::PROVIDER;
use crate::payments::signature::Signer;
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{
    GatewayReply, GatewayResponse, PaymentInstrument, PaymentPayload, SignedPayload,
    TransactionRequest, PAY_PAGE_INSTRUMENT, REDIRECT_MODE_POST,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Url;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Fallback when the gateway reports failure without a message
pub const UNKNOWN_GATEWAY_ERROR: &str = "Unknown error";

const REDIRECT_URL_POINTER: &str = "/instrumentResponse/redirectInfo/url";

pub struct TransactionInitiator {
    gateway: Arc<dyn PaymentGateway>,
    signer: Signer,
    callback_url: Url,
}

impl TransactionInitiator {
    pub fn new(config: &Config, gateway: Arc<dyn PaymentGateway>) -> AppResult<Self> {
        let callback_url = callback_url(&config.redirect.public_base_url)?;
        Ok(Self {
            gateway,
            signer: Signer::new(&config.gateway.salt_key, &config.gateway.salt_index),
            callback_url,
        })
    }

    /// Canonical pay request for `request`
    pub fn build_payload(&self, request: &TransactionRequest) -> AppResult<PaymentPayload> {
        request.validate()?;

        let mut redirect_url = self.callback_url.clone();
        redirect_url
            .query_pairs_mut()
            .append_pair("bookingId", &request.order_id);
        let redirect_url = redirect_url.to_string();

        Ok(PaymentPayload {
            merchant_id: self.gateway.merchant_id().to_string(),
            merchant_transaction_id: request.order_id.clone(),
            merchant_user_id: request.payer_phone.clone(),
            amount: request.amount_in_minor_units()?,
            callback_url: redirect_url.clone(),
            redirect_url,
            redirect_mode: REDIRECT_MODE_POST.to_string(),
            mobile_number: request.payer_phone.clone(),
            payment_instrument: PaymentInstrument {
                kind: PAY_PAGE_INSTRUMENT.to_string(),
            },
        })
    }

    pub fn sign_payload(&self, payload: &PaymentPayload) -> AppResult<SignedPayload> {
        let json = serde_json::to_vec(payload)
            .map_err(|e| AppError::internal(format!("Failed to serialize payload: {}", e)))?;
        let encoded_body = STANDARD.encode(json);
        let signature = self.signer.sign_payment(&encoded_body);

        Ok(SignedPayload {
            encoded_body,
            signature,
        })
    }

    /// Start a payment and return where to send the payer
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn initiate(&self, request: &TransactionRequest) -> AppResult<GatewayResponse> {
        let payload = self.build_payload(request)?;

        info!(
            "Initiating {} payment: amount={} order_id={}",
            PROVIDER, payload.amount, payload.merchant_transaction_id
        );

        let signed = self.sign_payload(&payload)?;
        let reply = self.gateway.submit_payment(&signed).await?;
        let response = interpret_pay_reply(reply)?;

        match &response {
            GatewayResponse::Success { .. } => {
                info!("{} payment initiated: order_id={}", PROVIDER, request.order_id)
            }
            GatewayResponse::Failure { message } => warn!(
                "{} rejected payment: order_id={} message={}",
                PROVIDER, request.order_id, message
            ),
        }

        Ok(response)
    }
}

fn callback_url(public_base_url: &str) -> AppResult<Url> {
    let mut base = Url::parse(public_base_url)
        .map_err(|e| AppError::internal(format!("Invalid public base URL: {}", e)))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(CALLBACK_PATH.trim_start_matches('/'))
        .map_err(|e| AppError::internal(format!("Invalid callback URL: {}", e)))
}

fn interpret_pay_reply(reply: GatewayReply) -> AppResult<GatewayResponse> {
    if !reply.success {
        return Ok(GatewayResponse::Failure {
            message: reply
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_GATEWAY_ERROR.to_string()),
        });
    }

    let redirect_url = reply
        .data
        .as_ref()
        .and_then(|data| data.pointer(REDIRECT_URL_POINTER))
        .and_then(|url| url.as_str())
        .ok_or_else(|| {
            error!("{} success reply is missing the redirect URL", PROVIDER);
            AppError::from(ExternalError::InvalidResponse {
                provider: PROVIDER.to_string(),
                message: "missing data.instrumentResponse.redirectInfo.url".to_string(),
            })
        })?;

    Ok(GatewayResponse::Success {
        redirect_url: redirect_url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::payments::signature::sign;
    use crate::payments::testing::StubGateway;
    use serde_json::json;

    fn order() -> TransactionRequest {
        TransactionRequest {
            amount: 500,
            order_id: "ORD123".to_string(),
            payer_phone: "9999999999".to_string(),
        }
    }

    fn initiator(gateway: Arc<StubGateway>) -> TransactionInitiator {
        TransactionInitiator::new(&test_config(), gateway).unwrap()
    }

    fn decode(signed: &SignedPayload) -> PaymentPayload {
        serde_json::from_slice(&STANDARD.decode(&signed.encoded_body).unwrap()).unwrap()
    }

    #[test]
    fn test_callback_url_joins_base() {
        assert_eq!(
            callback_url("https://api.tpfc.test").unwrap().as_str(),
            "https://api.tpfc.test/payment-tpfc/api/phonepe/callback"
        );
        assert_eq!(
            callback_url("https://tpfc.test/backend").unwrap().as_str(),
            "https://tpfc.test/backend/payment-tpfc/api/phonepe/callback"
        );
    }

    #[test]
    fn test_build_payload() {
        let payload = initiator(Arc::new(StubGateway::default()))
            .build_payload(&order())
            .unwrap();

        assert_eq!(payload.merchant_id, "MERCHANTUAT");
        assert_eq!(payload.merchant_transaction_id, "ORD123");
        assert_eq!(payload.merchant_user_id, "9999999999");
        assert_eq!(payload.mobile_number, "9999999999");
        assert_eq!(payload.amount, 50_000);
        assert_eq!(
            payload.redirect_url,
            "https://api.tpfc.test/payment-tpfc/api/phonepe/callback?bookingId=ORD123"
        );
        assert_eq!(payload.callback_url, payload.redirect_url);
        assert_eq!(payload.redirect_mode, "POST");
        assert_eq!(payload.payment_instrument.kind, "PAY_PAGE");
    }

    #[test]
    fn test_signature_covers_encoded_payload() {
        let initiator = initiator(Arc::new(StubGateway::default()));
        let payload = initiator.build_payload(&order()).unwrap();
        let signed = initiator.sign_payload(&payload).unwrap();

        assert_eq!(
            signed.signature,
            sign(
                &format!("{}/pg/v1/pay", signed.encoded_body),
                "test-salt-key",
                "1"
            )
        );
        assert_eq!(decode(&signed), payload);
    }

    #[tokio::test]
    async fn test_initiate_success_returns_redirect() {
        let gateway = Arc::new(StubGateway::replying(json!({
            "success": true,
            "data": {"instrumentResponse": {"redirectInfo": {"url": "https://pay.example/x"}}}
        })));

        let response = initiator(gateway.clone()).initiate(&order()).await.unwrap();
        assert_eq!(
            response,
            GatewayResponse::Success {
                redirect_url: "https://pay.example/x".to_string()
            }
        );

        let submitted = gateway.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(decode(&submitted[0]).amount, 50_000);
    }

    #[tokio::test]
    async fn test_initiate_passes_gateway_message_through() {
        let gateway = Arc::new(StubGateway::replying(json!({
            "success": false,
            "message": "INSUFFICIENT_FUNDS"
        })));

        let response = initiator(gateway).initiate(&order()).await.unwrap();
        assert_eq!(
            response,
            GatewayResponse::Failure {
                message: "INSUFFICIENT_FUNDS".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_initiate_failure_without_message_uses_fallback() {
        let gateway = Arc::new(StubGateway::replying(json!({"success": false})));
        let response = initiator(gateway).initiate(&order()).await.unwrap();
        assert_eq!(
            response,
            GatewayResponse::Failure {
                message: UNKNOWN_GATEWAY_ERROR.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_success_without_redirect_is_server_error() {
        let gateway = Arc::new(StubGateway::replying(json!({"success": true, "data": {}})));
        let err = initiator(gateway).initiate(&order()).await.unwrap_err();
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let gateway = Arc::new(StubGateway::failing());
        let err = initiator(gateway).initiate(&order()).await.unwrap_err();
        assert_eq!(err.public_message(), "Internal Server Error");
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_gateway() {
        let gateway = Arc::new(StubGateway::default());
        let mut request = order();
        request.amount = 0;

        let err = initiator(gateway.clone()).initiate(&request).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(gateway.submitted().is_empty());
    }
}
