mod accounts;
mod health;
mod images;
mod records;
mod static_files;

use crate::api::response::ApiError;
use crate::auth::AuthError;
use crate::pipeline::{StagingError, UploadError};
use crate::storage::DatabaseError;

pub use accounts::{login, signup};
pub use health::health;
pub use images::{delete_image, get_images, upload_image};
pub use records::{delete_record, get_records, save_record, update_record};
pub use static_files::serve_upload;

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::InvalidCredentials => {
                ApiError::unauthorized(e.to_string())
            }
            AuthError::EmailExists => ApiError::bad_request(e.to_string()),
            AuthError::Database(inner) => inner.into(),
            AuthError::Hash(_) | AuthError::Signing(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::NoFile => ApiError::bad_request(e.to_string()),
            UploadError::NotFound => ApiError::not_found(e.to_string()),
            UploadError::Thumbnail(ref inner) => {
                ApiError::internal(format!("Error generating thumbnail: {inner}"))
            }
            UploadError::Store(ref inner) => {
                ApiError::internal(format!("Failed to store image: {inner}"))
            }
            UploadError::Staging(_) => ApiError::internal(e.to_string()),
            UploadError::Database(inner) => inner.into(),
        }
    }
}

impl From<StagingError> for ApiError {
    fn from(e: StagingError) -> Self {
        match e {
            StagingError::TooLarge { .. } => ApiError::payload_too_large(e.to_string()),
            StagingError::Io(_) => ApiError::internal(format!("Failed to stage upload: {e}")),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        tracing::error!(error = %e, "Database operation failed");
        ApiError::internal("Database error")
    }
}

/// Reject blank required text fields.
fn require_present(fields: &[(&str, &str)]) -> Result<(), ApiError> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(ApiError::bad_request(format!("{name} is required")));
        }
    }
    Ok(())
}
