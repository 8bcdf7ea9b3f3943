use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Slug {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    // At most one slug per post is current; the rest exist so old URLs keep
    // redirecting to the canonical one.
    pub is_current: bool,
}
