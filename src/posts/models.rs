use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub caption: String,
    pub is_public: bool,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing, default)]
    pub deleted_at: Option<String>,
}

fn default_is_public() -> bool {
    true
}

/// Body of `POST /posts` and `PUT /posts/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct PostRequest {
    pub content: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post: Post,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
