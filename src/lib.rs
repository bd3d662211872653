//! TPFC payment backend
//!
//! Server-side bridge between the booking front-end and the PhonePe hosted payment
//! page: signed payment initiation, status verification and callback handling.

pub mod api;
pub mod config;
pub mod error;
pub mod payments;

pub use config::Config;
pub use error::{AppError, AppResult};
