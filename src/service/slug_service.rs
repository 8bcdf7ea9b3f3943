use crate::errors::{unique_violation, AppError, AppResult, UniqueViolation};
use crate::model::slug::Slug;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

/// Safety valve for the collision retry loop. Not expected to trigger in
/// practice; hitting it means the namespace for a base candidate is gone.
const MAX_SLUG_ATTEMPTS: u32 = 100_000;

/// Fallback for titles with no slug-safe characters at all.
const DEFAULT_SLUG: &str = "post";

lazy_static! {
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Derive a URL-safe slug candidate from a post title: lowercase, runs of
/// anything that isn't a-z or 0-9 collapsed into single hyphens.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

impl Slug {
    /// Give `post_id` a new current slug derived from `title`, disambiguating
    /// with `-2`, `-3`, ... suffixes until an insert beats the global
    /// uniqueness constraint. Returns the name that ended up current.
    ///
    /// The caller decides whether a new slug is warranted at all; an
    /// unchanged title should skip this entirely.
    pub async fn assign(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        title: &str,
    ) -> AppResult<String> {
        let base = slugify(title);

        // Demote the previous current slug first. Both statements share the
        // caller's transaction, so a failure below rolls the demotion back
        // and the old slug stays current.
        sqlx::query("UPDATE slugs SET is_current = FALSE WHERE post_id = ? AND is_current = TRUE")
            .bind(post_id)
            .execute(&mut **tx)
            .await?;

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = if attempt == 1 {
                base.clone()
            } else {
                format!("{base}-{attempt}")
            };

            let inserted = sqlx::query(
                "INSERT INTO slugs (post_id, name, is_current) VALUES (?, ?, TRUE)",
            )
            .bind(post_id)
            .bind(&candidate)
            .execute(&mut **tx)
            .await;

            match inserted {
                Ok(_) => return Ok(candidate),
                Err(err) if unique_violation(&err) == Some(UniqueViolation::SlugName) => {
                    debug!("slug '{candidate}' is taken, trying the next suffix");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::TooManySlugCollisions {
            base,
            attempts: MAX_SLUG_ATTEMPTS,
        })
    }

    /// Look up a slug by name, current or historical.
    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> AppResult<Option<Slug>> {
        let slug = sqlx::query_as::<_, Slug>("SELECT * FROM slugs WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        Ok(slug)
    }

    /// The canonical slug name for a post. Every created post has one.
    pub async fn current_name(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
    ) -> AppResult<String> {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM slugs WHERE post_id = ? AND is_current = TRUE",
        )
        .bind(post_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(name)
    }
}
