use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub thumbnails: ThumbnailConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Value for `Access-Control-Allow-Origin`; `*` allows any origin.
    pub cors_allow_origin: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Blobs stored inside the redb database
    Database,
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Directory incoming uploads are spooled to before reaching the backend.
    /// `None` uses the system temp directory.
    pub upload_tmp_dir: Option<String>,
    pub s3: S3Config,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name (required when backend is s3)
    pub bucket: Option<String>,
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, R2, ...). Enables path-style addressing.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub key_prefix: String,
}

#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub enabled: bool,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8083".to_string(),
            data_dir: "./data".to_string(),
            cors_allow_origin: "*".to_string(),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            key_prefix: "uploads/".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./uploads".to_string(),
            upload_tmp_dir: None,
            s3: S3Config::default(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_width: 200,
            max_height: 200,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8083".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let cors_allow_origin =
            std::env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".to_string());

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();

        let token_ttl_seconds = env_parse("TOKEN_TTL_SECONDS").unwrap_or(3600);

        let max_upload_size = env_parse("MAX_UPLOAD_SIZE").unwrap_or(10 * 1024 * 1024); // 10MB

        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "s3" => StorageBackend::S3,
            "database" | "db" => StorageBackend::Database,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./uploads".to_string());

        let upload_tmp_dir = std::env::var("UPLOAD_TMP_DIR").ok();

        let s3 = S3Config {
            bucket: std::env::var("AWS_BUCKET_NAME").ok(),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: std::env::var("S3_ENDPOINT").ok(),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            key_prefix: std::env::var("S3_KEY_PREFIX").unwrap_or_else(|_| "uploads/".to_string()),
        };

        let thumbnails = ThumbnailConfig {
            enabled: match std::env::var("THUMBNAILS_ENABLED") {
                Ok(raw) => parse_flag("THUMBNAILS_ENABLED", &raw)?,
                Err(_) => true,
            },
            max_width: env_parse("THUMBNAIL_WIDTH").unwrap_or(200),
            max_height: env_parse("THUMBNAIL_HEIGHT").unwrap_or(200),
        };

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
                cors_allow_origin,
            },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_seconds,
            },
            storage: StorageConfig {
                backend,
                local_storage_path,
                upload_tmp_dir,
                s3,
            },
            thumbnails,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "JWT_SECRET must be set".to_string(),
            ));
        }

        if self.auth.token_ttl_seconds <= 0 {
            return Err(ConfigError::ValidationError(
                "TOKEN_TTL_SECONDS must be positive".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::S3 && self.storage.s3.bucket.is_none() {
            return Err(ConfigError::ValidationError(
                "AWS_BUCKET_NAME is required when STORAGE_BACKEND=s3".to_string(),
            ));
        }

        if self.thumbnails.enabled
            && (self.thumbnails.max_width == 0 || self.thumbnails.max_height == 0)
        {
            return Err(ConfigError::ValidationError(
                "THUMBNAIL_WIDTH and THUMBNAIL_HEIGHT must be greater than 0".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Database
            && self.max_upload_size > 64 * 1024 * 1024
        {
            tracing::warn!(
                "MAX_UPLOAD_SIZE is {} bytes with the database backend. \
                 Large blobs inflate the redb file; consider local or s3.",
                self.max_upload_size
            );
        }

        Ok(())
    }
}

/// Case-insensitive `true/false`, `1/0`, `yes/no`, `on/off`.
fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ValidationError(format!(
            "{name} must be true or false, got '{raw}'"
        ))),
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
