//! Payment gateway integration module
//!
//! Signing, initiation, status verification and callback handling for the PhonePe
//! hosted payment page. All three entry points resolve to a [`types::TransactionOutcome`]
//! keyed by the gateway transaction id.

pub mod callback;
pub mod initiator;
pub mod providers;
pub mod signature;
pub mod traits;
pub mod types;
pub mod verifier;

pub use callback::CallbackHandler;
pub use initiator::TransactionInitiator;
pub use providers::PhonePeClient;
pub use traits::PaymentGateway;
pub use verifier::StatusVerifier;

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::{AppResult, ExternalError};
    use crate::payments::traits::PaymentGateway;
    use crate::payments::types::{GatewayReply, SignedPayload, TransactionId};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory gateway that records requests and returns a canned reply
    #[derive(Default)]
    pub struct StubGateway {
        reply: Option<GatewayReply>,
        submitted: Mutex<Vec<SignedPayload>>,
        status_lookups: Mutex<Vec<(TransactionId, String)>>,
    }

    impl StubGateway {
        pub fn replying(reply: serde_json::Value) -> Self {
            Self {
                reply: Some(serde_json::from_value(reply).unwrap()),
                ..Default::default()
            }
        }

        /// Every call fails at the transport level
        pub fn failing() -> Self {
            Self::default()
        }

        pub fn submitted(&self) -> Vec<SignedPayload> {
            self.submitted.lock().unwrap().clone()
        }

        pub fn status_lookups(&self) -> Vec<(TransactionId, String)> {
            self.status_lookups.lock().unwrap().clone()
        }

        fn respond(&self) -> AppResult<GatewayReply> {
            self.reply.clone().ok_or_else(|| {
                ExternalError::Transport {
                    provider: "stub".to_string(),
                    message: "connection refused".to_string(),
                }
                .into()
            })
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        fn merchant_id(&self) -> &str {
            "MERCHANTUAT"
        }

        async fn submit_payment(&self, payload: &SignedPayload) -> AppResult<GatewayReply> {
            self.submitted.lock().unwrap().push(payload.clone());
            self.respond()
        }

        async fn fetch_status(
            &self,
            transaction_id: &TransactionId,
            signature: &str,
        ) -> AppResult<GatewayReply> {
            self.status_lookups
                .lock()
                .unwrap()
                .push((transaction_id.clone(), signature.to_string()));
            self.respond()
        }
    }
}
