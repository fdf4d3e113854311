use redb::{MultimapTableDefinition, TableDefinition};

/// Id counters: entity name -> last issued id
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// User accounts: id -> UserRecord (msgpack)
pub const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Unique email index: email -> user id
pub const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

/// Uploaded images: id -> ImageRecord (msgpack)
pub const IMAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("images");

/// Owner index: user id -> image ids
pub const USER_IMAGES: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_images");

/// Generic data records: id -> DataRecord (msgpack)
pub const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("records");

/// Owner index: user id -> record ids
pub const USER_RECORDS: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_records");

/// Object bytes for the database storage backend: key -> bytes
pub const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// Content types for the database storage backend: key -> MIME type
pub const BLOB_CONTENT_TYPES: TableDefinition<&str, &str> =
    TableDefinition::new("blob_content_types");
