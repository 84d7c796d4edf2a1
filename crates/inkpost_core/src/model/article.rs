//! Article domain model and read aggregate.
//!
//! # Invariants
//! - `slug` is unique among articles and derived from `title`.
//! - `published_at` is set iff `is_published` is true.
//! - `view_count` never decreases and is incremented atomically in storage.

use crate::model::taxonomy::{Category, CategoryId, Tag};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for one article.
pub type ArticleId = Uuid;

/// Canonical article record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Stable global ID.
    pub uuid: ArticleId,
    /// Display title the slug is derived from.
    pub title: String,
    /// Unique URL-safe identifier.
    pub slug: String,
    /// Markdown body.
    pub body: String,
    /// Optional short summary used by listings.
    pub summary: Option<String>,
    /// Optional cover image reference (opaque storage key).
    pub cover_path: Option<String>,
    /// Public visibility flag.
    pub is_published: bool,
    /// Denormalized read counter, >= 0.
    pub view_count: i64,
    /// Owning category; exactly one at all times.
    pub category_id: CategoryId,
    /// Opaque reference into the external identity layer.
    pub author_id: String,
    /// Epoch milliseconds; `Some` iff `is_published`.
    pub published_at: Option<i64>,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Last update timestamp in epoch milliseconds.
    pub updated_at: i64,
}

impl Article {
    /// Creates a new unpublished article with a generated stable ID.
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        body: impl Into<String>,
        category_id: CategoryId,
        author_id: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            slug: slug.into(),
            body: body.into(),
            summary: None,
            cover_path: None,
            is_published: false,
            view_count: 0,
            category_id,
            author_id: author_id.into(),
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flips the publish flag, keeping `published_at` in lockstep.
    ///
    /// false -> true stamps now; true -> false clears the stamp. Setting the
    /// current value again is a no-op and preserves the original stamp.
    pub fn set_published(&mut self, published: bool) {
        if self.is_published == published {
            return;
        }
        self.is_published = published;
        self.published_at = published.then(now_epoch_ms);
    }
}

/// Article assembled with its denormalized relations for read responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleAggregate {
    pub article: Article,
    pub category: Category,
    /// Associated tags sorted by name.
    pub tags: Vec<Tag>,
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
