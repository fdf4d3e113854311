use chrono::Utc;
use redb::ReadableTable;

use super::db::{next_id, Database, DatabaseError};
use super::models::UserRecord;
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert a new user, claiming `email` in the unique index.
    ///
    /// The email lookup and both inserts share one write transaction, and redb
    /// admits a single writer at a time, so two concurrent signups for the same
    /// address cannot both succeed. Returns `None` when the email is taken.
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        debug_assert!(!email.is_empty(), "email must not be empty");

        let write_txn = self.begin_write()?;

        let taken = {
            let emails = write_txn.open_table(USER_EMAILS)?;
            let result = emails.get(email)?.is_some();
            result
        };
        if taken {
            write_txn.abort()?;
            return Ok(None);
        }

        let user = UserRecord {
            id: next_id(&write_txn, "users")?,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        {
            let mut users = write_txn.open_table(USERS)?;
            let data = rmp_serde::to_vec_named(&user)?;
            users.insert(user.id, data.as_slice())?;

            let mut emails = write_txn.open_table(USER_EMAILS)?;
            emails.insert(email, user.id)?;
        }
        write_txn.commit()?;

        Ok(Some(user))
    }

    /// Look up a user by exact (case-sensitive) email
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;

        let id = match emails.get(email)? {
            Some(v) => v.value(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        match users.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }
}
