//! Shared utilities: error types, password hashing, input sanitization.

pub mod crypto;
pub mod error;
pub mod sanitize;

pub use error::{AuthError, IntegrityError, Result};
