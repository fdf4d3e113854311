use super::db::{Database, DatabaseError};
use super::tables::*;

impl Database {
    // ========================================================================
    // Blob operations (database storage backend)
    // ========================================================================

    pub fn put_blob(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut blobs = write_txn.open_table(BLOBS)?;
            blobs.insert(key, data)?;

            let mut types = write_txn.open_table(BLOB_CONTENT_TYPES)?;
            types.insert(key, content_type)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Returns the blob bytes and content type, if present
    pub fn get_blob(&self, key: &str) -> Result<Option<(Vec<u8>, Option<String>)>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let blobs = read_txn.open_table(BLOBS)?;

        let data = match blobs.get(key)? {
            Some(v) => v.value().to_vec(),
            None => return Ok(None),
        };

        let types = read_txn.open_table(BLOB_CONTENT_TYPES)?;
        let content_type = types.get(key)?.map(|v| v.value().to_string());

        Ok(Some((data, content_type)))
    }

    /// Remove a blob. Returns false if it did not exist.
    pub fn delete_blob(&self, key: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = {
            let mut blobs = write_txn.open_table(BLOBS)?;
            let existed = blobs.remove(key)?.is_some();

            let mut types = write_txn.open_table(BLOB_CONTENT_TYPES)?;
            types.remove(key)?;
            existed
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
