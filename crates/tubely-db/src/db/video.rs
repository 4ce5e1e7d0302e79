use super::VideoRepository;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use tubely_core::{models::VideoRecord, AppError};
use uuid::Uuid;

/// Postgres-backed video records
#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new record (used by seeding and admin tooling)
    #[tracing::instrument(skip(self, video), fields(db.table = "videos", db.operation = "insert", db.record_id = %video.id))]
    pub async fn create(&self, video: &VideoRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO videos (id, user_id, title, description, created_at, updated_at, thumbnail_url, video_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(video.id)
        .bind(video.user_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError> {
        let video = sqlx::query_as::<Postgres, VideoRecord>(
            "SELECT id, user_id, title, description, created_at, updated_at, thumbnail_url, video_url FROM videos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self, video), fields(db.table = "videos", db.operation = "update", db.record_id = %video.id))]
    async fn update(&self, video: &VideoRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET title = $2, description = $3, thumbnail_url = $4, video_url = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Video {} not found", video.id)));
        }

        Ok(())
    }
}
