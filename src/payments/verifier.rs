//! Transaction status verification

use crate::config::Config;
use crate::error::AppResult;
use crate::payments::providers::phonepe::PROVIDER;
use crate::payments::signature::Signer;
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{GatewayReply, TransactionId, TransactionOutcome};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Normalized answer of the status API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    /// The gateway answered the lookup
    Reported(TransactionOutcome),
    /// The gateway refused the lookup (unknown transaction, bad signature, ...)
    Rejected {
        transaction_id: TransactionId,
        message: Option<String>,
    },
}

pub struct StatusVerifier {
    gateway: Arc<dyn PaymentGateway>,
    signer: Signer,
}

impl StatusVerifier {
    pub fn new(config: &Config, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            gateway,
            signer: Signer::new(&config.gateway.salt_key, &config.gateway.salt_index),
        }
    }

    #[instrument(skip_all, fields(transaction_id = %transaction_id))]
    pub async fn verify(&self, transaction_id: TransactionId) -> AppResult<StatusReport> {
        let segment = transaction_id.as_path_segment()?;
        let signature = self.signer.sign_status(self.gateway.merchant_id(), segment);

        let reply = self.gateway.fetch_status(&transaction_id, &signature).await?;
        let report = interpret_status_reply(transaction_id, reply);

        match &report {
            StatusReport::Reported(outcome) => info!(
                "{} status: transaction_id={} outcome={:?}",
                PROVIDER,
                outcome.transaction_id(),
                outcome
            ),
            StatusReport::Rejected {
                transaction_id,
                message,
            } => warn!(
                "{} status lookup rejected: transaction_id={} message={:?}",
                PROVIDER, transaction_id, message
            ),
        }

        Ok(report)
    }
}

fn interpret_status_reply(transaction_id: TransactionId, reply: GatewayReply) -> StatusReport {
    if !reply.success {
        return StatusReport::Rejected {
            transaction_id,
            message: reply.message,
        };
    }

    let state = reply.data.as_ref().and_then(|data| {
        data.get("state")
            .or_else(|| data.get("status"))
            .and_then(|s| s.as_str())
    });

    StatusReport::Reported(TransactionOutcome::from_state(
        transaction_id,
        state,
        reply.message.clone(),
    ))
}
