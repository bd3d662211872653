//! PhonePe payment gateway client
//!
//! HTTP transport for the PhonePe hosted-page APIs. Requests carry the `X-VERIFY`
//! signature and `X-MERCHANT-ID` headers; replies are decoded into a
//! [`GatewayReply`] envelope and handed back uninterpreted.

use crate::config::GatewayConfig;
use crate::error::{AppError, AppResult, ExternalError};
use crate::payments::signature::{status_message, PAY_API_PATH};
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{GatewayReply, PayRequestBody, SignedPayload, TransactionId};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const PROVIDER: &str = "PhonePe";
pub const X_VERIFY: &str = "X-VERIFY";
pub const X_MERCHANT_ID: &str = "X-MERCHANT-ID";

/// PhonePe gateway client
#[derive(Debug, Clone)]
pub struct PhonePeClient {
    client: Client,
    base_url: String,
    merchant_id: String,
    timeout: Duration,
}

impl PhonePeClient {
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("TPFC-Payments/1.0")
            .build()
            .map_err(|e| {
                AppError::internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            merchant_id: config.merchant_id.clone(),
            timeout: config.timeout,
        })
    }

    fn request(&self, method: Method, path: &str, signature: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header(X_VERIFY, signature)
            .header(X_MERCHANT_ID, &self.merchant_id)
    }

    /// Send a request and decode the JSON envelope
    ///
    /// Non-2xx replies are still decoded: the gateway reports business failures
    /// with a 4xx status and a regular envelope.
    async fn send(&self, request: RequestBuilder) -> AppResult<GatewayReply> {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        // The client's own timeout bounds the whole exchange, body included
        let (status, body) = exchange.await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error()
            } else {
                error!("{} request failed: {}", PROVIDER, e);
                AppError::from(ExternalError::Transport {
                    provider: PROVIDER.to_string(),
                    message: e.to_string(),
                })
            }
        })?;

        if !status.is_success() {
            warn!("{} responded with HTTP {}", PROVIDER, status);
        }

        serde_json::from_str::<GatewayReply>(&body).map_err(|e| {
            error!("Failed to parse {} response (HTTP {}): {}", PROVIDER, status, e);
            ExternalError::InvalidResponse {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, e),
            }
            .into()
        })
    }

    fn timeout_error(&self) -> AppError {
        warn!(
            "{} request timed out after {}s",
            PROVIDER,
            self.timeout.as_secs()
        );
        ExternalError::Timeout {
            provider: PROVIDER.to_string(),
            seconds: self.timeout.as_secs(),
        }
        .into()
    }
}

#[async_trait]
impl PaymentGateway for PhonePeClient {
    fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    async fn submit_payment(&self, payload: &SignedPayload) -> AppResult<GatewayReply> {
        debug!("Submitting payment to {}", PROVIDER);

        let request = self
            .request(Method::POST, PAY_API_PATH, &payload.signature)
            .json(&PayRequestBody {
                request: &payload.encoded_body,
            });

        self.send(request).await
    }

    async fn fetch_status(
        &self,
        transaction_id: &TransactionId,
        signature: &str,
    ) -> AppResult<GatewayReply> {
        debug!(
            "Fetching {} status: transaction_id={}",
            PROVIDER, transaction_id
        );

        let path = status_message(&self.merchant_id, transaction_id.as_path_segment()?);
        let request = self.request(Method::GET, &path, signature);

        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_new_trims_trailing_slash() {
        let mut config = test_config().gateway;
        config.base_url = "https://gateway.test/apis/".to_string();
        let client = PhonePeClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://gateway.test/apis");
        assert_eq!(client.merchant_id(), "MERCHANTUAT");
    }

    #[tokio::test]
    async fn test_status_rejects_unsafe_id_before_sending() {
        let mut config = test_config().gateway;
        config.base_url = "http://127.0.0.1:9".to_string();
        let client = PhonePeClient::new(&config).unwrap();

        let err = client
            .fetch_status(&TransactionId::new("T1?force=true").unwrap(), "sig###1")
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transport_error() {
        let mut config = test_config().gateway;
        // Port 9 (discard) on loopback is closed in test environments
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout = Duration::from_secs(2);
        let client = PhonePeClient::new(&config).unwrap();

        let err = client
            .fetch_status(&TransactionId::new("T1").unwrap(), "sig###1")
            .await
            .unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.public_message(), "Internal Server Error");
    }
}
