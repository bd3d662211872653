//! Payment gateway trait definitions
//!
//! The gateway client is the only part of the payment core that does network I/O.
//! Signing and interpretation live in the initiator, verifier and callback handler.

use crate::error::AppResult;
use crate::payments::types::{GatewayReply, SignedPayload, TransactionId};
use async_trait::async_trait;

/// Transport to the payment gateway's pay and status APIs
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Merchant id sent as `X-MERCHANT-ID` and embedded in status paths
    fn merchant_id(&self) -> &str;

    /// Submit a signed payment payload to the pay endpoint
    ///
    /// # Arguments
    /// * `payload` - Base64 payload and its `X-VERIFY` signature
    ///
    /// # Returns
    /// * `GatewayReply` - The decoded JSON envelope, whether the gateway reported
    ///   success or a business failure
    async fn submit_payment(&self, payload: &SignedPayload) -> AppResult<GatewayReply>;

    /// Look up the status of a transaction
    ///
    /// # Arguments
    /// * `transaction_id` - Transaction to look up
    /// * `signature` - `X-VERIFY` value computed over the status path
    async fn fetch_status(
        &self,
        transaction_id: &TransactionId,
        signature: &str,
    ) -> AppResult<GatewayReply>;
}
