use super::VideoRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tubely_core::{models::VideoRecord, AppError};
use uuid::Uuid;

/// Process-local video records. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryVideoRepository {
    videos: Arc<RwLock<HashMap<Uuid, VideoRecord>>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub async fn insert(&self, video: VideoRecord) {
        self.videos.write().await.insert(video.id, video);
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError> {
        Ok(self.videos.read().await.get(&id).cloned())
    }

    async fn update(&self, video: &VideoRecord) -> Result<(), AppError> {
        let mut videos = self.videos.write().await;
        match videos.get_mut(&video.id) {
            Some(existing) => {
                *existing = video.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Video {} not found", video.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> VideoRecord {
        let now = Utc::now();
        VideoRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Boots".to_string(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            thumbnail_url: None,
            video_url: None,
        }
    }

    #[tokio::test]
    async fn test_get_and_update() {
        let repo = InMemoryVideoRepository::new();
        let mut video = record();
        repo.insert(video.clone()).await;

        assert_eq!(repo.get(video.id).await.unwrap(), Some(video.clone()));

        video.video_url = Some("bucket,landscape/a.mp4".to_string());
        repo.update(&video).await.unwrap();
        assert_eq!(
            repo.get(video.id).await.unwrap().unwrap().video_url.as_deref(),
            Some("bucket,landscape/a.mp4")
        );
    }

    #[tokio::test]
    async fn test_missing_record() {
        let repo = InMemoryVideoRepository::new();
        let video = record();
        assert_eq!(repo.get(video.id).await.unwrap(), None);
        assert!(matches!(
            repo.update(&video).await,
            Err(AppError::NotFound(_))
        ));
    }
}
