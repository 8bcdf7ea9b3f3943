use crate::errors::{not_found, AppResult};
use crate::model::post::{CreateResponse, Post, PostCreate, PostRow, PostUpdate};
use crate::model::slug::Slug;
use crate::model::tag::Tag;
use crate::util::common::split_tag_input;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeSet;

/// Retry budget handed to the tag reconciler. The race it recovers from is
/// rare and self-resolving, so this is generous without looping forever.
const MAX_RECONCILE_RETRIES: u32 = 25;

impl Post {
    /// Create a post, assign its first slug and attach its tags, all in one
    /// transaction. A failure in any step rolls back the post row too.
    pub async fn create(pool: &SqlitePool, post: &PostCreate) -> AppResult<CreateResponse> {
        let now = Utc::now().timestamp_millis();

        let mut tx = pool.begin().await?;

        let post_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO posts (title, subtitle, body, is_draft, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&post.title)
        .bind(&post.subtitle)
        .bind(&post.body)
        .bind(post.is_draft)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // A fresh post always gets a slug.
        let slug = Slug::assign(&mut tx, post_id, &post.title).await?;

        if let Some(ref tags) = post.tags {
            let desired = split_tag_input(tags);
            Tag::reconcile(&mut tx, post_id, &desired, MAX_RECONCILE_RETRIES).await?;
        }

        tx.commit().await?;

        Ok(CreateResponse { id: post_id, slug })
    }

    /// Edit a post. A new slug is assigned only when the title actually
    /// changed; otherwise the existing current slug is kept as is.
    /// Returns the canonical slug name after the edit.
    pub async fn update(pool: &SqlitePool, id: i64, post: &PostUpdate) -> AppResult<String> {
        let now = Utc::now().timestamp_millis();

        let mut tx = pool.begin().await?;

        let previous_title = sqlx::query_scalar::<_, String>(
            "SELECT title FROM posts WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(&format!("post {id}")))?;

        sqlx::query(
            r#"
            UPDATE posts
            SET title = ?, subtitle = ?, body = ?, is_draft = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.subtitle)
        .bind(&post.body)
        .bind(post.is_draft)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let slug = if post.title != previous_title {
            Slug::assign(&mut tx, id, &post.title).await?
        } else {
            Slug::current_name(&mut tx, id).await?
        };

        if let Some(ref tags) = post.tags {
            let desired = split_tag_input(tags);
            Tag::reconcile(&mut tx, id, &desired, MAX_RECONCILE_RETRIES).await?;
        }

        tx.commit().await?;

        Ok(slug)
    }

    /// Soft-delete a post and release its tags, so tags that lose their last
    /// association get soft-deleted along with it. Slugs stay untouched.
    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let now = Utc::now().timestamp_millis();

        let mut tx = pool.begin().await?;

        let deleted = sqlx::query(
            "UPDATE posts SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            return Err(not_found(&format!("post {id}")));
        }

        Tag::reconcile(&mut tx, id, &BTreeSet::new(), MAX_RECONCILE_RETRIES).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT * FROM posts WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let mut post = Post::from(row);
        Post::attach_tags(pool, &mut post).await?;
        Post::attach_slug(pool, &mut post).await?;

        Ok(Some(post))
    }

    /// Resolve a slug (current or historical) to its post. The returned flag
    /// tells whether the matched slug is the current one; a false means the
    /// caller should redirect to `post.slug`.
    pub async fn find_by_slug(pool: &SqlitePool, name: &str) -> AppResult<Option<(Post, bool)>> {
        let Some(slug) = Slug::find_by_name(pool, name).await? else {
            return Ok(None);
        };

        let Some(post) = Post::find_by_id(pool, slug.post_id).await? else {
            // The slug row outlives a soft-deleted post.
            return Ok(None);
        };

        Ok(Some((post, slug.is_current)))
    }

    async fn attach_tags(pool: &SqlitePool, post: &mut Post) -> AppResult<()> {
        post.tags = sqlx::query_scalar::<_, String>(
            r#"
            SELECT t.name
            FROM tags t
            JOIN tags_posts tp ON tp.tag_id = t.id
            WHERE tp.post_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(post.row.id)
        .fetch_all(pool)
        .await?;

        Ok(())
    }

    async fn attach_slug(pool: &SqlitePool, post: &mut Post) -> AppResult<()> {
        post.slug = sqlx::query_scalar::<_, String>(
            "SELECT name FROM slugs WHERE post_id = ? AND is_current = TRUE",
        )
        .bind(post.row.id)
        .fetch_optional(pool)
        .await?;

        Ok(())
    }
}
