//! Category and tag records.
//!
//! Both carry a denormalized `post_count` equal to the number of *published*
//! articles referencing them; the canonical counting rule is applied by the
//! aggregate recount queries, never by caller input.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one category.
pub type CategoryId = Uuid;
/// Stable identifier for one tag.
pub type TagId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub uuid: CategoryId,
    /// Unique display name the slug is derived from.
    pub name: String,
    /// Unique URL-safe identifier.
    pub slug: String,
    pub description: Option<String>,
    /// Published articles in this category, >= 0.
    pub post_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub uuid: TagId,
    /// Unique display name the slug is derived from.
    pub name: String,
    /// Unique URL-safe identifier.
    pub slug: String,
    /// Distinct published articles linked to this tag, >= 0.
    pub post_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}
