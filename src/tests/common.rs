use crate::config::db::DB;
use crate::model::post::PostCreate;
use crate::model::slug::Slug;
use crate::model::tag::Tag;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or("blogme=debug".to_string().into()))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Fresh migrated in-memory database. A single connection so every query in
/// a test sees the same in-memory store.
pub async fn setup_db() -> SqlitePool {
    init_tracing();

    let db = DB::new("sqlite::memory:", 1).await.unwrap();
    db.migrate().await.unwrap();
    db.pool.clone()
}

pub fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn post_create(title: &str, tags: Option<&str>) -> PostCreate {
    PostCreate {
        title: title.to_string(),
        subtitle: None,
        body: "body".to_string(),
        tags: tags.map(str::to_string),
        is_draft: false,
    }
}

pub async fn tag_row(pool: &SqlitePool, name: &str) -> Option<Tag> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .unwrap()
}

pub async fn tag_names(pool: &SqlitePool, post_id: i64) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT t.name
        FROM tags t
        JOIN tags_posts tp ON tp.tag_id = t.id
        WHERE tp.post_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn slug_rows(pool: &SqlitePool, post_id: i64) -> Vec<Slug> {
    sqlx::query_as::<_, Slug>("SELECT * FROM slugs WHERE post_id = ? ORDER BY id")
        .bind(post_id)
        .fetch_all(pool)
        .await
        .unwrap()
}
