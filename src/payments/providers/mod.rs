//! Payment gateway implementations
//!
//! Concrete implementations of the PaymentGateway trait.

pub mod phonepe;

pub use phonepe::PhonePeClient;
