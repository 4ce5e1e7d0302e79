//! Configuration module
//!
//! This module provides the configuration for the API server: HTTP, authentication,
//! record store, object storage, and the limits applied to each upload.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_SIGNED_URL_TTL_SECS;
use crate::storage_types::StorageBackend;

// Common constants
const DEFAULT_PORT: u16 = 8091;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_VIDEO_SIZE_MB: u64 = 1024;
const PROBE_TIMEOUT_SECS: u64 = 30;
const NORMALIZE_TIMEOUT_SECS: u64 = 300;
const STORE_TIMEOUT_SECS: u64 = 600;

/// Base server configuration
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
}

/// Per-request limits for the upload pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    /// Hard ceiling on the buffered video body
    pub max_video_size_bytes: u64,
    pub probe_timeout: Duration,
    pub normalize_timeout: Duration,
    pub store_timeout: Duration,
    pub signed_url_ttl: Duration,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_video_size_bytes: MAX_VIDEO_SIZE_MB * 1024 * 1024,
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
            normalize_timeout: Duration::from_secs(NORMALIZE_TIMEOUT_SECS),
            store_timeout: Duration::from_secs(STORE_TIMEOUT_SECS),
            signed_url_ttl: Duration::from_secs(DEFAULT_SIGNED_URL_TTL_SECS),
        }
    }
}

/// Video pipeline configuration
#[derive(Clone, Debug)]
pub struct VideoPipelineConfig {
    pub base: BaseConfig,
    /// When unset, records are kept in memory (development only)
    pub database_url: Option<String>,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub local_storage_signing_key: Option<String>,
    // Media tooling
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub scratch_dir: PathBuf,
    pub upload_limits: UploadLimits,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<VideoPipelineConfig>);

impl Config {
    fn inner(&self) -> &VideoPipelineConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = VideoPipelineConfig::from_lookup(|name| env::var(name).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    /// S3_REGION wins over AWS_REGION when both are set
    pub fn s3_region(&self) -> Option<&str> {
        self.inner()
            .s3_region
            .as_deref()
            .or(self.inner().aws_region.as_deref())
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    /// Key for local signed URLs; falls back to the JWT secret
    pub fn local_storage_signing_key(&self) -> &str {
        self.inner()
            .local_storage_signing_key
            .as_deref()
            .unwrap_or(&self.inner().base.jwt_secret)
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.inner().ffprobe_path
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.inner().ffmpeg_path
    }

    pub fn scratch_dir(&self) -> &PathBuf {
        &self.inner().scratch_dir
    }

    pub fn upload_limits(&self) -> &UploadLimits {
        &self.inner().upload_limits
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl VideoPipelineConfig {
    /// Build configuration from a variable lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());
        let is_production = is_production_name(&environment);

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let base = BaseConfig {
            server_port,
            cors_origins,
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), MAX_CONNECTIONS),
            db_timeout_seconds: parse_or(lookup("DB_TIMEOUT_SECONDS"), CONNECTION_TIMEOUT_SECS),
            jwt_secret: lookup("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
        };

        let storage_backend = match non_empty(lookup("STORAGE_BACKEND")) {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let upload_limits = UploadLimits {
            max_video_size_bytes: parse_or(lookup("MAX_VIDEO_SIZE_MB"), MAX_VIDEO_SIZE_MB)
                * 1024
                * 1024,
            probe_timeout: Duration::from_secs(parse_or(
                lookup("PROBE_TIMEOUT_SECS"),
                PROBE_TIMEOUT_SECS,
            )),
            normalize_timeout: Duration::from_secs(parse_or(
                lookup("NORMALIZE_TIMEOUT_SECS"),
                NORMALIZE_TIMEOUT_SECS,
            )),
            store_timeout: Duration::from_secs(parse_or(
                lookup("STORE_TIMEOUT_SECS"),
                STORE_TIMEOUT_SECS,
            )),
            signed_url_ttl: Duration::from_secs(parse_or(
                lookup("SIGNED_URL_TTL_SECS"),
                DEFAULT_SIGNED_URL_TTL_SECS,
            )),
        };

        let config = VideoPipelineConfig {
            base,
            database_url: non_empty(lookup("DATABASE_URL")),
            storage_backend,
            s3_bucket: non_empty(lookup("S3_BUCKET")),
            s3_region: non_empty(lookup("S3_REGION")),
            s3_endpoint: non_empty(lookup("S3_ENDPOINT")),
            aws_region: non_empty(lookup("AWS_REGION")),
            local_storage_path: non_empty(lookup("LOCAL_STORAGE_PATH")),
            local_storage_base_url: non_empty(lookup("LOCAL_STORAGE_BASE_URL"))
                .map(|url| url.trim_end_matches('/').to_string()),
            local_storage_signing_key: non_empty(lookup("LOCAL_STORAGE_SIGNING_KEY")),
            ffprobe_path: lookup("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            scratch_dir: non_empty(lookup("SCRATCH_DIR"))
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            upload_limits,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        match self.database_url.as_deref() {
            Some(url) if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) => {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
            None if is_production_name(&self.base.environment) => {
                return Err(anyhow::anyhow!("DATABASE_URL must be set in production"));
            }
            _ => {}
        }

        if self.upload_limits.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be greater than zero"));
        }

        if self.upload_limits.signed_url_ttl.is_zero() {
            return Err(anyhow::anyhow!(
                "SIGNED_URL_TTL_SECS must be greater than zero"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
