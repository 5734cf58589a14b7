//! Credential primitives for the user service: password hashing and session
//! tokens.

use thiserror::Error;

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService, TOKEN_TTL};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Signature, expiry or format check failed. The message is deliberately
    /// the same for every cause.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}
