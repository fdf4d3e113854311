use async_trait::async_trait;
use bytes::Bytes;

use super::{served_locator, validate_key, ObjectStore, ObjectStoreError, StoredObject};
use crate::storage::Database;

/// Keeps object bytes in the application database's blob table.
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ObjectStore for DatabaseStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        validate_key(key)?;
        let (owned_key, content_type) = (key.to_string(), content_type.to_string());
        self.db
            .run(move |db| db.put_blob(&owned_key, &data, &content_type))
            .await?;
        Ok(served_locator(key))
    }

    async fn get(&self, key: &str) -> Result<StoredObject, ObjectStoreError> {
        validate_key(key)?;
        let owned_key = key.to_string();
        let blob = self.db.run(move |db| db.get_blob(&owned_key)).await?;

        match blob {
            Some((data, content_type)) => Ok(StoredObject {
                data: Bytes::from(data),
                content_type,
            }),
            None => Err(ObjectStoreError::NotFound(key.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let owned_key = key.to_string();
        self.db.run(move |db| db.delete_blob(&owned_key)).await?;
        Ok(())
    }
}
