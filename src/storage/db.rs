use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("redb error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Record encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Record decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Every redb error type folds into `redb::Error`, boxed to keep the enum small.
macro_rules! from_redb {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for DatabaseError {
                fn from(e: $ty) -> Self {
                    DatabaseError::Redb(Box::new(e.into()))
                }
            }
        )+
    };
}

from_redb!(
    redb::Error,
    redb::CommitError,
    redb::DatabaseError,
    redb::StorageError,
    redb::TableError,
    redb::TransactionError,
);

/// Handle to the embedded store. Clones share one redb instance.
#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("salon.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        // Initialize application tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SEQUENCES)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(IMAGES)?;
            let _ = write_txn.open_multimap_table(USER_IMAGES)?;
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_multimap_table(USER_RECORDS)?;
            let _ = write_txn.open_table(BLOBS)?;
            let _ = write_txn.open_table(BLOB_CONTENT_TYPES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run `op` on the blocking pool. redb commits fsync, so request
    /// handlers go through here instead of touching the database inline.
    pub async fn run<T, F>(&self, op: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Database) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || op(&db)).await?
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }
}

/// Allocate the next id for `sequence` inside an open write transaction.
/// Ids start at 1 and are never reused, even after deletes.
pub(super) fn next_id(write_txn: &WriteTransaction, sequence: &str) -> Result<u64, DatabaseError> {
    let mut table = write_txn.open_table(SEQUENCES)?;
    let last = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let id = last + 1;
    table.insert(sequence, id)?;
    Ok(id)
}
