//! salon-backend - accounts, appointment records and image uploads for a salon app
//!
//! This crate provides:
//! - Signup/login with Argon2 password hashing and HS256 bearer tokens
//! - Owner-scoped CRUD over appointment-style data records
//! - Image upload with optional thumbnails over swappable storage backends
//!   (local filesystem, database blobs, S3)
//! - redb embedded database for users, records and image locators

pub mod api;
pub mod auth;
pub mod config;
pub mod object_store;
pub mod pipeline;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use auth::TokenService;
use config::Config;
use pipeline::UploadPipeline;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub tokens: TokenService,
    pub uploads: UploadPipeline,
}
