//! Accounts and bearer-token authentication.
//!
//! - [`TokenService`] signs and verifies the stateless session token
//! - [`accounts`] implements signup and login over the credential store
//! - [`middleware::require_auth`] guards routes and binds [`AuthUser`]

pub mod accounts;
pub mod middleware;
mod password;
mod token;

pub use middleware::{require_auth, AuthUser};
pub use password::{hash_password, verify_password};
pub use token::{bearer_token, Claims, TokenService};

use thiserror::Error;

use crate::storage::DatabaseError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already exists")]
    EmailExists,
    #[error("Password hashing error: {0}")]
    Hash(String),
    #[error("Token signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
