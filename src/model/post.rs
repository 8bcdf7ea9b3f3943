use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// which Rust types correspond to which sqlite column types:
// https://docs.rs/sqlx/latest/sqlx/sqlite/types/index.html
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    pub is_draft: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Post {
    #[serde(flatten)]
    pub row: PostRow,

    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            row,
            tags: vec![],
            slug: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostCreate {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    /// Raw comma-separated tag input, exactly as submitted.
    pub tags: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Deserialize)]
pub struct PostUpdate {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    pub tags: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub id: i64,
    pub slug: String,
}
