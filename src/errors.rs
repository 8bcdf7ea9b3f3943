use derive_more::{Display, From};
use sqlx::error::ErrorKind;
use std::error::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Display, From)]
pub enum AppError {
    /// A concurrent reconciliation removed a tag association this call also
    /// tried to remove. Transient; the reconciler retries from fresh state.
    #[display("race condition: {_0}")]
    RaceCondition(String),

    /// The slug namespace for a base candidate is exhausted. Surfaced to the
    /// caller as "choose a different title".
    #[display("no free slug for '{base}' after {attempts} attempts")]
    TooManySlugCollisions { base: String, attempts: u32 },

    #[display("not found: {_0}")]
    NotFound(String),

    #[display("database error: {_0}")]
    #[from]
    Sqlx(sqlx::Error),

    #[display("{_0}")]
    #[from]
    Anyhow(anyhow::Error),
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Sqlx(err) => Some(err),
            AppError::Anyhow(err) => err.source(),
            _ => None,
        }
    }
}

pub fn not_found(msg: &str) -> AppError {
    AppError::NotFound(msg.to_string())
}

/// The uniqueness violations this crate recognizes as control flow: a tag
/// name collision switches to the revive path, an association pair collision
/// is an idempotent no-op, a slug name collision triggers the suffix retry.
/// Any other constraint violation propagates untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UniqueViolation {
    TagName,
    TagPostPair,
    SlugName,
}

/// Classify a storage error as one of the recognized uniqueness violations.
///
/// SQLite names the violated columns in the error message
/// (e.g. "UNIQUE constraint failed: tags.name"), which together with the
/// error kind is enough to tell the three shapes apart.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<UniqueViolation> {
    let sqlx::Error::Database(dbe) = err else {
        return None;
    };
    if !matches!(dbe.kind(), ErrorKind::UniqueViolation) {
        return None;
    }

    let message = dbe.message();
    if message.contains("tags.name") {
        Some(UniqueViolation::TagName)
    } else if message.contains("tags_posts.tag_id") && message.contains("tags_posts.post_id") {
        Some(UniqueViolation::TagPostPair)
    } else if message.contains("slugs.name") {
        Some(UniqueViolation::SlugName)
    } else {
        None
    }
}
