use chrono::Utc;
use redb::ReadableTable;

use super::db::{next_id, Database, DatabaseError};
use super::models::{ImageRecord, NewImage};
use super::tables::*;

impl Database {
    // ========================================================================
    // Image operations
    // ========================================================================

    /// Store an image record and add it to the owner index
    pub fn insert_image(&self, image: NewImage) -> Result<ImageRecord, DatabaseError> {
        let write_txn = self.begin_write()?;

        let record = ImageRecord {
            id: next_id(&write_txn, "images")?,
            user_id: image.user_id,
            image_path: image.image_path,
            image_key: image.image_key,
            thumbnail_path: image.thumbnail_path,
            thumbnail_key: image.thumbnail_key,
            content_type: image.content_type,
            byte_size: image.byte_size,
            created_at: Utc::now(),
        };

        {
            let mut table = write_txn.open_table(IMAGES)?;
            let data = rmp_serde::to_vec_named(&record)?;
            table.insert(record.id, data.as_slice())?;

            let mut owners = write_txn.open_multimap_table(USER_IMAGES)?;
            owners.insert(record.user_id, record.id)?;
        }
        write_txn.commit()?;

        Ok(record)
    }

    /// Get an image only if it belongs to `user_id`
    pub fn get_image_for_owner(
        &self,
        id: u64,
        user_id: u64,
    ) -> Result<Option<ImageRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(IMAGES)?;

        match table.get(id)? {
            Some(data) => {
                let image: ImageRecord = rmp_serde::from_slice(data.value())?;
                Ok((image.user_id == user_id).then_some(image))
            }
            None => Ok(None),
        }
    }

    /// All images owned by `user_id`, newest first
    pub fn list_images(&self, user_id: u64) -> Result<Vec<ImageRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owners = read_txn.open_multimap_table(USER_IMAGES)?;
        let table = read_txn.open_table(IMAGES)?;

        let mut ids = Vec::new();
        for id in owners.get(user_id)? {
            ids.push(id?.value());
        }

        let mut images = Vec::with_capacity(ids.len());
        for id in ids.into_iter().rev() {
            if let Some(data) = table.get(id)? {
                images.push(rmp_serde::from_slice(data.value())?);
            }
        }

        Ok(images)
    }

    /// Drop the thumbnail locator from an image owned by `user_id`.
    /// Returns false when no such image exists for that owner.
    pub fn clear_thumbnail(&self, id: u64, user_id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let cleared = {
            let mut table = write_txn.open_table(IMAGES)?;
            let image: Option<ImageRecord> = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match image {
                Some(mut image) if image.user_id == user_id => {
                    image.thumbnail_path = None;
                    image.thumbnail_key = None;
                    let data = rmp_serde::to_vec_named(&image)?;
                    table.insert(id, data.as_slice())?;
                    true
                }
                _ => false,
            }
        };

        write_txn.commit()?;
        Ok(cleared)
    }

    /// Delete an image owned by `user_id`. Returns false when no such image
    /// exists for that owner.
    pub fn delete_image(&self, id: u64, user_id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let owned = {
            let table = write_txn.open_table(IMAGES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let image: ImageRecord = rmp_serde::from_slice(data.value())?;
                    image.user_id == user_id
                }
                None => false,
            };
            result
        };

        if owned {
            let mut table = write_txn.open_table(IMAGES)?;
            table.remove(id)?;

            let mut owners = write_txn.open_multimap_table(USER_IMAGES)?;
            owners.remove(user_id, id)?;
        }

        write_txn.commit()?;
        Ok(owned)
    }
}
