//! Application state shared by every request.
//!
//! Built once at startup and handed to handlers as `Arc<AppState>`. Nothing in it is
//! mutated per request.

use crate::auth::JwtValidator;
use std::path::PathBuf;
use std::sync::Arc;
use tubely_core::UploadLimits;
use tubely_db::VideoRepository;
#[cfg(feature = "storage-local")]
use tubely_storage::LocalStorage;
use tubely_storage::Storage;
use tubely_processing::{MediaProbe, StreamNormalizer};

/// Object storage and the local media pipeline.
#[derive(Clone)]
pub struct MediaConfig {
    pub storage: Arc<dyn Storage>,
    /// Set only for the local backend; serves `/media` with signature checks
    #[cfg(feature = "storage-local")]
    pub local_storage: Option<Arc<LocalStorage>>,
    pub probe: Arc<dyn MediaProbe>,
    pub normalizer: Arc<dyn StreamNormalizer>,
    pub limits: UploadLimits,
    pub scratch_dir: PathBuf,
}

/// Authentication configuration.
#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt: Arc<JwtValidator>,
}

#[derive(Clone)]
pub struct AppState {
    pub videos: Arc<dyn VideoRepository>,
    pub media: MediaConfig,
    pub security: SecurityConfig,
}
