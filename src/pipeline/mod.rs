//! Image upload pipeline.
//!
//! An upload moves through fixed steps:
//! 1. the staged file must exist (`NoFile` otherwise)
//! 2. the original is written to the object store; the staged temp file is
//!    removed right after this step whatever its outcome
//! 3. if thumbnails are enabled, one is derived and written to the store
//! 4. a single image record referencing both locators is inserted
//!
//! A record is only ever written after every object it references has been
//! stored. When a later step fails, objects already written are removed on a
//! best-effort basis.

mod staging;
mod thumbnail;

pub use staging::{resolve_content_type, StagedUpload, StagingArea, StagingError, StagingWriter};
pub use thumbnail::{derive_thumbnail, fit_within, Thumbnail, ThumbnailError, Thumbnailer};

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::models::{ImageRecord, NewImage};
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No image uploaded")]
    NoFile,
    #[error("Image not found")]
    NotFound,
    #[error("Failed to read staged upload: {0}")]
    Staging(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Store(#[from] ObjectStoreError),
    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] ThumbnailError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub struct UploadPipeline {
    db: Database,
    store: Arc<dyn ObjectStore>,
    thumbnailer: Option<Thumbnailer>,
    staging: StagingArea,
}

impl UploadPipeline {
    pub fn new(
        db: Database,
        store: Arc<dyn ObjectStore>,
        thumbnailer: Option<Thumbnailer>,
        staging: StagingArea,
    ) -> Self {
        Self {
            db,
            store,
            thumbnailer,
            staging,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Persist a staged upload (and its thumbnail) and record it for `user_id`.
    pub async fn upload(
        &self,
        user_id: u64,
        staged: Option<StagedUpload>,
    ) -> Result<ImageRecord, UploadError> {
        let staged = staged.ok_or(UploadError::NoFile)?;
        let key = object_key(&staged.file_name);
        let content_type = staged.content_type.clone();
        let byte_size = staged.byte_size;

        let persisted = self.persist_original(&staged, &key).await;
        staged.discard();
        let (image_path, data) = persisted?;

        let (thumbnail_path, stored_thumbnail_key) = match self.thumbnailer {
            Some(thumbnailer) => {
                let thumbnail = match thumbnailer.derive(data).await {
                    Ok(thumbnail) => thumbnail,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Thumbnail derivation failed");
                        self.discard_objects(&[key.as_str()]).await;
                        return Err(e.into());
                    }
                };

                let thumb_key = thumbnail_key(&key, thumbnail.extension);
                match self
                    .store
                    .put(&thumb_key, Bytes::from(thumbnail.data), thumbnail.content_type)
                    .await
                {
                    Ok(locator) => (Some(locator), Some(thumb_key)),
                    Err(e) => {
                        self.discard_objects(&[key.as_str()]).await;
                        return Err(e.into());
                    }
                }
            }
            None => (None, None),
        };

        let new_image = NewImage {
            user_id,
            image_path,
            image_key: key.clone(),
            thumbnail_path,
            thumbnail_key: stored_thumbnail_key.clone(),
            content_type,
            byte_size,
        };

        match self.db.run(move |db| db.insert_image(new_image)).await {
            Ok(record) => {
                tracing::debug!(image_id = record.id, user_id, key = %key, "Stored image");
                Ok(record)
            }
            Err(e) => {
                let mut keys = vec![key.as_str()];
                keys.extend(stored_thumbnail_key.as_deref());
                self.discard_objects(&keys).await;
                Err(e.into())
            }
        }
    }

    /// Images owned by `user_id`, newest first.
    pub async fn list(&self, user_id: u64) -> Result<Vec<ImageRecord>, UploadError> {
        Ok(self.db.run(move |db| db.list_images(user_id)).await?)
    }

    /// Delete an image owned by `user_id`.
    ///
    /// Backend objects go first; if any of them cannot be removed the record
    /// is kept and the store error is returned. A record never keeps a
    /// locator whose object is already gone.
    pub async fn delete(&self, id: u64, user_id: u64) -> Result<(), UploadError> {
        let image = self
            .db
            .run(move |db| db.get_image_for_owner(id, user_id))
            .await?
            .ok_or(UploadError::NotFound)?;

        if let Some(ref thumb_key) = image.thumbnail_key {
            self.store.delete(thumb_key).await?;
        }

        if let Err(e) = self.store.delete(&image.image_key).await {
            if image.thumbnail_key.is_some() {
                self.forget_thumbnail(id, user_id).await;
            }
            return Err(e.into());
        }

        if !self.db.run(move |db| db.delete_image(id, user_id)).await? {
            return Err(UploadError::NotFound);
        }

        tracing::debug!(image_id = id, user_id, "Deleted image");
        Ok(())
    }

    async fn persist_original(
        &self,
        staged: &StagedUpload,
        key: &str,
    ) -> Result<(String, Bytes), UploadError> {
        let data = staged.read().await?;
        let locator = self
            .store
            .put(key, data.clone(), &staged.content_type)
            .await?;
        Ok((locator, data))
    }

    /// The thumbnail object was removed but the image survives.
    async fn forget_thumbnail(&self, id: u64, user_id: u64) {
        if let Err(e) = self.db.run(move |db| db.clear_thumbnail(id, user_id)).await {
            tracing::warn!(image_id = id, error = %e, "Failed to clear deleted thumbnail");
        }
    }

    async fn discard_objects(&self, keys: &[&str]) {
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to remove orphaned object");
            }
        }
    }
}

/// `<uuid>_<sanitized file name>`
pub fn object_key(file_name: &str) -> String {
    let mut name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();
    name = name.trim_start_matches('.').to_string();
    if name.is_empty() {
        name = "image".to_string();
    }
    format!("{}_{}", uuid::Uuid::new_v4().simple(), name)
}

/// `thumbnail_<key stem>.<extension>`
pub fn thumbnail_key(key: &str, extension: &str) -> String {
    let stem = key.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(key);
    format!("thumbnail_{stem}.{extension}")
}
