use async_trait::async_trait;
use bytes::Bytes;

use super::{validate_key, ObjectStore, ObjectStoreError, StoredObject};
use crate::config::S3Config;

/// S3 (or S3-compatible) bucket backend. Locators are public object URLs.
pub struct S3Store {
    bucket: s3::Bucket,
    key_prefix: String,
    public_base: String,
}

impl S3Store {
    pub fn new(config: &S3Config) -> Result<Self, anyhow::Error> {
        let bucket_name = config
            .bucket
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("AWS_BUCKET_NAME is not set"))?;

        let region = match config.endpoint {
            Some(ref endpoint) => s3::Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<s3::Region>()
                .map_err(|e| anyhow::anyhow!("Invalid AWS_REGION '{}': {e}", config.region))?,
        };

        // With no explicit keys the credential chain (env, profile, instance role) is used.
        let credentials = s3::creds::Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )?;

        let mut bucket = s3::Bucket::new(bucket_name, region, credentials)?;
        let public_base = match config.endpoint {
            Some(ref endpoint) => {
                bucket = bucket.with_path_style();
                format!("{}/{}", endpoint.trim_end_matches('/'), bucket_name)
            }
            None => format!("https://{bucket_name}.s3.amazonaws.com"),
        };

        Ok(Self {
            bucket: *bucket,
            key_prefix: config.key_prefix.clone(),
            public_base,
        })
    }

    fn object_path(&self, key: &str) -> Result<String, ObjectStoreError> {
        validate_key(key)?;
        Ok(format!("{}{}", self.key_prefix, key))
    }

    fn locator(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        let path = self.object_path(key)?;

        let resp = self
            .bucket
            .put_object_with_content_type(&path, &data, content_type)
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        let status = resp.status_code();
        if !(200..300).contains(&status) {
            return Err(ObjectStoreError::Backend(format!(
                "S3 upload failed ({status}): {}",
                String::from_utf8_lossy(resp.as_slice())
            )));
        }

        Ok(self.locator(&path))
    }

    async fn get(&self, key: &str) -> Result<StoredObject, ObjectStoreError> {
        let path = self.object_path(key)?;

        let resp = self
            .bucket
            .get_object(&path)
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        let status = resp.status_code();
        if status == 404 {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        if !(200..300).contains(&status) {
            return Err(ObjectStoreError::Backend(format!(
                "S3 download failed ({status})"
            )));
        }

        let content_type = resp.headers().get("content-type").cloned();
        Ok(StoredObject {
            data: Bytes::copy_from_slice(resp.as_slice()),
            content_type,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;

        let resp = self
            .bucket
            .delete_object(&path)
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        // 404 is fine -- object already gone
        let status = resp.status_code();
        if !(200..300).contains(&status) && status != 404 {
            return Err(ObjectStoreError::Backend(format!(
                "S3 delete failed ({status}): {}",
                String::from_utf8_lossy(resp.as_slice())
            )));
        }

        Ok(())
    }
}
