use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    // Non-null means the tag is currently referenced by no post. Maintained
    // exclusively by the reconciler.
    pub deleted_at: Option<i64>,
}

/// Partition of existing vs desired tag names. The three sets are pairwise
/// disjoint and together cover the union of both inputs.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub common: BTreeSet<String>,
}
