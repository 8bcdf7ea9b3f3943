use crate::errors::{not_found, unique_violation, AppError, AppResult, UniqueViolation};
use crate::model::tag::{Tag, TagDiff};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Partition existing vs desired tag names into added, removed and common.
///
/// Pure set arithmetic; comparison is case-sensitive exact match, any
/// normalization happened before the names got here.
pub fn diff_tags(existing: &BTreeSet<String>, desired: &BTreeSet<String>) -> TagDiff {
    TagDiff {
        added: desired.difference(existing).cloned().collect(),
        removed: existing.difference(desired).cloned().collect(),
        common: existing.intersection(desired).cloned().collect(),
    }
}

impl Tag {
    /// Reconcile the tags attached to `post_id` with `desired`, retrying up
    /// to `max_retries` times when a concurrent reconciliation wins a
    /// removal race. Each retry re-reads the association state, so a race
    /// that resolved itself completes without error.
    ///
    /// Runs entirely on the caller's transaction; on failure the caller's
    /// rollback undoes every partial step.
    pub async fn reconcile(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        desired: &BTreeSet<String>,
        max_retries: u32,
    ) -> AppResult<()> {
        let mut attempt = 0;
        loop {
            match Tag::try_reconcile(tx, post_id, desired).await {
                Ok(()) => return Ok(()),
                Err(AppError::RaceCondition(reason)) if attempt < max_retries => {
                    attempt += 1;
                    warn!(
                        "tag reconciliation for post {post_id} raced ({reason}), \
                         retry {attempt}/{max_retries}"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One reconciliation pass over freshly read state.
    async fn try_reconcile(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        desired: &BTreeSet<String>,
    ) -> AppResult<()> {
        let existing = Tag::names_for_post(tx, post_id).await?;
        let diff = diff_tags(&existing, desired);
        debug!(
            "reconciling tags for post {post_id}: {} added, {} removed, {} unchanged",
            diff.added.len(),
            diff.removed.len(),
            diff.common.len()
        );

        // Removals and additions each run strictly one at a time. The
        // insert-then-recover dance in add_to_post is only safe when no
        // sibling is mid-flight on the same transaction.
        for name in &diff.removed {
            Tag::remove_from_post(tx, post_id, name).await?;
        }
        for name in &diff.added {
            Tag::add_to_post(tx, post_id, name).await?;
        }
        // Names in common need no action.

        Ok(())
    }

    /// Tag names currently associated with a post.
    pub async fn names_for_post(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
    ) -> AppResult<BTreeSet<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT t.name
            FROM tags t
            JOIN tags_posts tp ON tp.tag_id = t.id
            WHERE tp.post_id = ?
            "#,
        )
        .bind(post_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(names.into_iter().collect())
    }

    /// Remove one tag from a post, soft-deleting the tag itself when the
    /// removed association was its last one.
    ///
    /// A zero-row delete means a concurrent reconciliation removed the
    /// association first; that surfaces as `RaceCondition` so the caller can
    /// retry against fresh state.
    pub(crate) async fn remove_from_post(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        name: &str,
    ) -> AppResult<()> {
        // Tags are never hard-deleted, so a missing row here is a
        // programming error, not a race.
        let tag = Tag::find_by_name(tx, name)
            .await?
            .ok_or_else(|| not_found(&format!("tag '{name}'")))?;

        let deleted = sqlx::query("DELETE FROM tags_posts WHERE tag_id = ? AND post_id = ?")
            .bind(tag.id)
            .bind(post_id)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::RaceCondition(format!(
                "no association left to delete for tag '{name}' on post {post_id}"
            )));
        }

        let remaining =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tags_posts WHERE tag_id = ?")
                .bind(tag.id)
                .fetch_one(&mut **tx)
                .await?;

        if remaining == 0 {
            let now = Utc::now().timestamp_millis();
            sqlx::query("UPDATE tags SET deleted_at = ? WHERE id = ?")
                .bind(now)
                .bind(tag.id)
                .execute(&mut **tx)
                .await?;
            debug!("tag '{name}' has no associations left, soft-deleted");
        }

        Ok(())
    }

    /// Attach one tag to a post, creating or reviving the tag row as needed.
    ///
    /// Two-phase: try the insert, and on a tags.name collision fall back to
    /// reviving the existing (soft-deleted) row. An association collision on
    /// exactly the pair being inserted means a concurrent reconciler got
    /// there first and is treated as already satisfied.
    pub(crate) async fn add_to_post(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        name: &str,
    ) -> AppResult<()> {
        let tag_id = match Tag::insert(tx, name).await {
            Ok(id) => id,
            Err(err) if unique_violation(&err) == Some(UniqueViolation::TagName) => {
                debug!("tag '{name}' already exists, reviving");
                Tag::revive(tx, name).await?
            }
            Err(err) => return Err(err.into()),
        };

        let inserted = sqlx::query("INSERT INTO tags_posts (tag_id, post_id) VALUES (?, ?)")
            .bind(tag_id)
            .bind(post_id)
            .execute(&mut **tx)
            .await;

        if let Err(err) = inserted {
            if unique_violation(&err) != Some(UniqueViolation::TagPostPair) {
                return Err(err.into());
            }
            // Swallow the collision only when the conflicting row is exactly
            // the pair we tried to insert; anything else is a real bug.
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM tags_posts WHERE tag_id = ? AND post_id = ?",
            )
            .bind(tag_id)
            .bind(post_id)
            .fetch_one(&mut **tx)
            .await?;

            if exists == 0 {
                return Err(err.into());
            }
            debug!("association of tag '{name}' with post {post_id} already exists");
        }

        Ok(())
    }

    /// All tags currently referenced by at least one post.
    pub async fn active(pool: &SqlitePool) -> AppResult<Vec<Tag>> {
        let tags =
            sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE deleted_at IS NULL ORDER BY name")
                .fetch_all(pool)
                .await?;

        Ok(tags)
    }

    pub async fn find_by_name(
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
    ) -> AppResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(tag)
    }

    async fn insert(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("INSERT INTO tags (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&mut **tx)
            .await
    }

    async fn revive(tx: &mut Transaction<'_, Sqlite>, name: &str) -> AppResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "UPDATE tags SET deleted_at = NULL WHERE name = ? RETURNING id",
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }
}
