use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub name: String,
    pub email: String,
    /// PHC-format password hash
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// An uploaded image and its optional thumbnail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub user_id: u64,
    /// Locator of the original image
    pub image_path: String,
    /// Backend key of the original image
    pub image_key: String,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub thumbnail_key: Option<String>,
    pub content_type: String,
    pub byte_size: u64,
    pub created_at: DateTime<Utc>,
}

/// Fields of an image record before an id is assigned
#[derive(Debug, Clone)]
pub struct NewImage {
    pub user_id: u64,
    pub image_path: String,
    pub image_key: String,
    pub thumbnail_path: Option<String>,
    pub thumbnail_key: Option<String>,
    pub content_type: String,
    pub byte_size: u64,
}

/// Caller-editable fields of a data record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    #[serde(deserialize_with = "date_only")]
    pub date: NaiveDate,
}

/// A user-owned data record (an appointment-style row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRecord {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl DataRecord {
    pub fn apply(&mut self, fields: &RecordFields) {
        self.name = fields.name.clone();
        self.email = fields.email.clone();
        self.phone = fields.phone.clone();
        self.service = fields.service.clone();
        self.date = fields.date;
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp and keeps only the date.
fn date_only<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| {
            serde::de::Error::custom(format!(
                "invalid date '{raw}', expected YYYY-MM-DD or an RFC 3339 timestamp"
            ))
        })
}
