use chrono::Utc;
use redb::{ReadableTable, WriteTransaction};

use super::db::{next_id, Database, DatabaseError};
use super::models::{DataRecord, RecordFields};
use super::tables::*;

impl Database {
    // ========================================================================
    // Data record operations
    // ========================================================================

    pub fn insert_record(
        &self,
        user_id: u64,
        fields: &RecordFields,
    ) -> Result<DataRecord, DatabaseError> {
        let write_txn = self.begin_write()?;

        let record = DataRecord {
            id: next_id(&write_txn, "records")?,
            user_id,
            name: fields.name.clone(),
            email: fields.email.clone(),
            phone: fields.phone.clone(),
            service: fields.service.clone(),
            date: fields.date,
            created_at: Utc::now(),
        };

        {
            let mut table = write_txn.open_table(RECORDS)?;
            let data = rmp_serde::to_vec_named(&record)?;
            table.insert(record.id, data.as_slice())?;

            let mut owners = write_txn.open_multimap_table(USER_RECORDS)?;
            owners.insert(user_id, record.id)?;
        }
        write_txn.commit()?;

        Ok(record)
    }

    /// All records owned by `user_id`, highest id first
    pub fn list_records(&self, user_id: u64) -> Result<Vec<DataRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owners = read_txn.open_multimap_table(USER_RECORDS)?;
        let table = read_txn.open_table(RECORDS)?;

        let mut ids = Vec::new();
        for id in owners.get(user_id)? {
            ids.push(id?.value());
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in ids.into_iter().rev() {
            if let Some(data) = table.get(id)? {
                records.push(rmp_serde::from_slice(data.value())?);
            }
        }

        Ok(records)
    }

    /// Overwrite the fields of a record matching both `id` and `user_id`.
    /// Returns false (and writes nothing) when no such record exists.
    pub fn update_record(
        &self,
        id: u64,
        user_id: u64,
        fields: &RecordFields,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let updated = match owned_record(&write_txn, id, user_id)? {
            Some(mut record) => {
                record.apply(fields);
                let data = rmp_serde::to_vec_named(&record)?;
                let mut table = write_txn.open_table(RECORDS)?;
                table.insert(id, data.as_slice())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Delete a record matching both `id` and `user_id`
    pub fn delete_record(&self, id: u64, user_id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let deleted = match owned_record(&write_txn, id, user_id)? {
            Some(_) => {
                let mut table = write_txn.open_table(RECORDS)?;
                table.remove(id)?;

                let mut owners = write_txn.open_multimap_table(USER_RECORDS)?;
                owners.remove(user_id, id)?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }
}

fn owned_record(
    write_txn: &WriteTransaction,
    id: u64,
    user_id: u64,
) -> Result<Option<DataRecord>, DatabaseError> {
    let table = write_txn.open_table(RECORDS)?;
    let result = match table.get(id)? {
        Some(data) => {
            let record: DataRecord = rmp_serde::from_slice(data.value())?;
            (record.user_id == user_id).then_some(record)
        }
        None => None,
    };
    Ok(result)
}
