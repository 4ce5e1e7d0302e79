//! Video record repositories
//!
//! The upload pipeline only needs two operations from the record store: fetch a record
//! by id and write back a modified record.

mod memory;
mod video;

use async_trait::async_trait;
use tubely_core::{models::VideoRecord, AppError};
use uuid::Uuid;

pub use memory::InMemoryVideoRepository;
pub use video::PgVideoRepository;

#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Fetch a record by id. `Ok(None)` when no such video exists.
    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError>;

    /// Persist title, description, thumbnail, playback pointer and `updated_at`.
    /// Fails with `NotFound` when the record no longer exists.
    async fn update(&self, video: &VideoRecord) -> Result<(), AppError>;
}
