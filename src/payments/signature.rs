//! Gateway request signing
//!
//! The gateway authenticates each call with an `X-VERIFY` header of the form
//! `hex(sha256(message ++ salt_key)) ### salt_index`. The message is API specific, so
//! every call computes a fresh signature.

use sha2::{Digest, Sha256};
use std::fmt;

/// API path signed together with the base64 payload on payment initiation
pub const PAY_API_PATH: &str = "/pg/v1/pay";

/// API path prefix for status lookups
pub const STATUS_API_PATH: &str = "/pg/v1/status";

/// Separator between the digest and the salt index
pub const SIGNATURE_SEPARATOR: &str = "###";

/// Compute the gateway signature for `message`
pub fn sign(message: &str, secret_key: &str, secret_index: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update(secret_key.as_bytes());
    format!(
        "{}{}{}",
        hex::encode(hasher.finalize()),
        SIGNATURE_SEPARATOR,
        secret_index
    )
}

/// Message signed for a payment initiation
pub fn payment_message(encoded_payload: &str) -> String {
    format!("{}{}", encoded_payload, PAY_API_PATH)
}

/// Message signed for a status lookup; also the request path
pub fn status_message(merchant_id: &str, transaction_id: &str) -> String {
    format!("{}/{}/{}", STATUS_API_PATH, merchant_id, transaction_id)
}

/// Holds the salt key and index
#[derive(Clone)]
pub struct Signer {
    secret_key: String,
    secret_index: String,
}

impl Signer {
    pub fn new(secret_key: impl Into<String>, secret_index: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            secret_index: secret_index.into(),
        }
    }

    pub fn sign(&self, message: &str) -> String {
        sign(message, &self.secret_key, &self.secret_index)
    }

    pub fn sign_payment(&self, encoded_payload: &str) -> String {
        self.sign(&payment_message(encoded_payload))
    }

    pub fn sign_status(&self, merchant_id: &str, transaction_id: &str) -> String {
        self.sign(&status_message(merchant_id, transaction_id))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("secret_key", &"<redacted>")
            .field("secret_index", &self.secret_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_known_vector() {
        assert_eq!(
            sign("abc", "key", "1"),
            "afcb12512ff218c850c8672f2f984f34d86f7739c5f4bee205442eb5a6ad6fff###1"
        );
    }

    #[test]
    fn test_status_signature_known_vector() {
        let signer = Signer::new("salt", "1");
        assert_eq!(
            signer.sign_status("M1", "T1"),
            "4c751530c8de32edb40e5744748bc8ec0592eef350f6eee812bc389b0dfa91a0###1"
        );
    }

    #[test]
    fn test_status_message_format() {
        assert_eq!(status_message("M1", "T1"), "/pg/v1/status/M1/T1");
        assert_ne!(status_message("M1", "T1"), status_message("M1", "T2"));
    }

    #[test]
    fn test_payment_signature_matches_formula() {
        let signer = Signer::new("salt", "3");
        let encoded = "eyJhIjoxfQ==";
        assert_eq!(
            signer.sign_payment(encoded),
            sign(&format!("{}/pg/v1/pay", encoded), "salt", "3")
        );
    }

    #[test]
    fn test_any_payload_change_changes_signature() {
        let signer = Signer::new("salt", "1");
        let a = signer.sign_payment("eyJhIjoxfQ==");
        let b = signer.sign_payment("eyJhIjoyfQ==");
        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_shape() {
        let signature = sign("message", "secret", "7");
        let (digest, index) = signature.split_once(SIGNATURE_SEPARATOR).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(index, "7");
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", Signer::new("very-secret", "1"));
        assert!(!rendered.contains("very-secret"));
    }
}
