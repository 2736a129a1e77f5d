use super::models::{Post, PostRequest};
use crate::common::{generate_post_id, ApiError, Validator};
use sqlx::SqlitePool;
use tracing::{info, warn};

pub struct PostsService {
    db: SqlitePool,
}

impl PostsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Live posts owned by `user_id`, newest first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Post>, ApiError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, content, caption, is_public, user_id, created_at, updated_at, deleted_at
            FROM posts
            WHERE user_id = ? AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(posts)
    }

    /// A live post owned by `user_id`; `NotFound` otherwise
    pub async fn get_for_user(&self, post_id: &str, user_id: &str) -> Result<Post, ApiError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, content, caption, is_public, user_id, created_at, updated_at, deleted_at
            FROM posts
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
    }

    pub async fn create(&self, user_id: &str, request: PostRequest) -> Result<Post, ApiError> {
        request.validate(&request).into_result()?;

        let post_id = generate_post_id();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO posts (id, content, caption, is_public, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post_id)
        .bind(&request.content)
        .bind(&request.caption)
        .bind(request.is_public)
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                warn!(user_id = %user_id, "Credential names a user that does not exist");
                ApiError::unauthorized()
            }
            e => ApiError::DatabaseError(e),
        })?;

        info!(post_id = %post_id, user_id = %user_id, "Created post");

        self.get_for_user(&post_id, user_id).await
    }

    /// Replace content, caption and visibility of an owned post
    pub async fn update(
        &self,
        post_id: &str,
        user_id: &str,
        request: PostRequest,
    ) -> Result<Post, ApiError> {
        // Ownership first so a foreign post is a 404 even with an invalid body
        self.get_for_user(post_id, user_id).await?;
        request.validate(&request).into_result()?;

        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET content = ?, caption = ?, is_public = ?, updated_at = ?
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&request.content)
        .bind(&request.caption)
        .bind(request.is_public)
        .bind(&now)
        .bind(post_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        info!(post_id = %post_id, user_id = %user_id, "Updated post");

        self.get_for_user(post_id, user_id).await
    }

    /// Soft delete
    pub async fn delete(&self, post_id: &str, user_id: &str) -> Result<(), ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET deleted_at = ?, updated_at = ?
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(post_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        info!(post_id = %post_id, user_id = %user_id, "Deleted post");
        Ok(())
    }
}
