//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs in process: records in memory, objects in a map or a temp directory,
//! and canned probe/normalizer answers, so no ffmpeg, database or S3 is needed.

#![allow(dead_code)]

pub mod fakes;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tubely_api::auth::JwtValidator;
use tubely_api::setup::routes;
use tubely_api::state::{AppState, MediaConfig, SecurityConfig};
use tubely_core::models::{Classification, VideoRecord};
use tubely_core::UploadLimits;
use tubely_db::{InMemoryVideoRepository, VideoRepository};
use tubely_processing::{MediaProbe, StreamNormalizer};
use tubely_storage::Storage;
use uuid::Uuid;

use fakes::{FakeNormalizer, FakeProbe, FakeStorage};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-at-least-32-characters";

/// Minimal bytes that stand in for an mp4 payload
pub const SAMPLE_VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom-sample-payload";

/// Knobs for one test application.
pub struct TestAppBuilder {
    storage: Arc<dyn Storage>,
    #[cfg(feature = "storage-local")]
    local_storage: Option<Arc<tubely_storage::LocalStorage>>,
    videos: Option<Arc<dyn VideoRepository>>,
    probe: Arc<dyn MediaProbe>,
    normalizer: Arc<dyn StreamNormalizer>,
    limits: UploadLimits,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            storage: Arc::new(FakeStorage::default()),
            #[cfg(feature = "storage-local")]
            local_storage: None,
            videos: None,
            probe: Arc::new(FakeProbe::Classify(Classification::Landscape)),
            normalizer: Arc::new(FakeNormalizer::Prefix),
            limits: UploadLimits {
                probe_timeout: Duration::from_secs(5),
                normalize_timeout: Duration::from_secs(5),
                store_timeout: Duration::from_secs(5),
                ..UploadLimits::default()
            },
        }
    }
}

impl TestAppBuilder {
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    #[cfg(feature = "storage-local")]
    pub fn local_storage(mut self, local: Arc<tubely_storage::LocalStorage>) -> Self {
        self.storage = local.clone();
        self.local_storage = Some(local);
        self
    }

    pub fn videos(mut self, videos: Arc<dyn VideoRepository>) -> Self {
        self.videos = Some(videos);
        self
    }

    pub fn probe(mut self, probe: FakeProbe) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn normalizer(mut self, normalizer: FakeNormalizer) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn max_video_size_bytes(mut self, max: u64) -> Self {
        self.limits.max_video_size_bytes = max;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.limits.probe_timeout = timeout;
        self
    }

    pub fn normalize_timeout(mut self, timeout: Duration) -> Self {
        self.limits.normalize_timeout = timeout;
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.limits.store_timeout = timeout;
        self
    }

    pub fn build(self) -> TestApp {
        let scratch = TempDir::new().unwrap();
        let records = InMemoryVideoRepository::new();
        let videos = self
            .videos
            .unwrap_or_else(|| Arc::new(records.clone()) as Arc<dyn VideoRepository>);
        let jwt = Arc::new(JwtValidator::new(TEST_JWT_SECRET));

        let state = Arc::new(AppState {
            videos,
            media: MediaConfig {
                storage: self.storage,
                #[cfg(feature = "storage-local")]
                local_storage: self.local_storage,
                probe: self.probe,
                normalizer: self.normalizer,
                limits: self.limits,
                scratch_dir: scratch.path().to_path_buf(),
            },
            security: SecurityConfig { jwt: jwt.clone() },
        });

        let server = TestServer::new(routes::api_router(state)).unwrap();

        TestApp {
            server,
            records,
            jwt,
            scratch,
        }
    }
}

/// Test application: server plus handles on its in-process collaborators.
pub struct TestApp {
    pub server: TestServer,
    /// The default record store; unused when a custom one was injected
    pub records: InMemoryVideoRepository,
    pub jwt: Arc<JwtValidator>,
    pub scratch: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        self.jwt
            .issue_token(user_id, chrono::Duration::hours(1))
            .unwrap()
    }

    /// Insert a record owned by `owner` into the default store.
    pub async fn seed_video(&self, owner: Uuid) -> VideoRecord {
        let video = new_video(owner);
        self.records.insert(video.clone()).await;
        video
    }

    /// Number of entries left in the scratch directory.
    pub fn scratch_entries(&self) -> usize {
        count_entries(self.scratch.path())
    }
}

pub fn new_video(owner: Uuid) -> VideoRecord {
    let now = Utc::now();
    VideoRecord {
        id: Uuid::new_v4(),
        user_id: owner,
        title: "Boots in the wild".to_string(),
        description: "A walk through the woods".to_string(),
        created_at: now,
        updated_at: now,
        thumbnail_url: None,
        video_url: None,
    }
}

pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub fn video_form(content_type: &str, body: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "video",
        Part::bytes(body.to_vec())
            .file_name("boots.mp4")
            .mime_type(content_type),
    )
}

pub fn video_path(id: impl std::fmt::Display) -> String {
    format!("/api/videos/{}", id)
}
