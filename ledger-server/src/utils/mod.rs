//! Utilities
//!
//! - [`AppError`] / [`AppResponse`] — HTTP error type and response envelope
//! - logging setup

pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse, AppResult, ok, ok_with_message};
