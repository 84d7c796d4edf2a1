//! Tag-link maintenance and denormalized counter recounts.
//!
//! # Responsibility
//! - Replace the article<->tag association set atomically.
//! - Batch-validate referenced categories/tags before any mutation.
//! - Recompute category/tag post-counts under the canonical counting rule.
//! - Arbitrate slug uniqueness pre-checks for every slug scope.
//!
//! # Invariants
//! - Every function here runs against the caller's connection; write helpers
//!   are only called inside an already-open transaction.
//! - The counting rule is "published articles only", applied uniformly by
//!   both recount queries.
//! - `missing_tags` reports *all* unknown ids, not just the first.

use crate::model::taxonomy::{CategoryId, TagId};
use crate::repo::{parse_uuid, RepoResult};
use crate::slug::SlugScope;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Returns whether `slug` is already taken within `scope`.
///
/// `exclude` skips one row, used when re-validating an entity against itself
/// during rename. Advisory only; the UNIQUE index decides races.
pub fn slug_in_use(
    conn: &Connection,
    scope: SlugScope,
    slug: &str,
    exclude: Option<Uuid>,
) -> RepoResult<bool> {
    let exclude_text = exclude.map(|id| id.to_string()).unwrap_or_default();
    let taken: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1 FROM {} WHERE slug = ?1 AND uuid <> ?2
            );",
            scope.table()
        ),
        params![slug, exclude_text],
        |row| row.get(0),
    )?;
    Ok(taken == 1)
}

/// Returns whether the category row exists.
pub fn category_exists(conn: &Connection, category_id: CategoryId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE uuid = ?1);",
        [category_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Single batch existence check over `tag_ids`; returns every id with no
/// matching tag row, in input order and deduplicated.
pub fn missing_tags(conn: &Connection, tag_ids: &[TagId]) -> RepoResult<Vec<TagId>> {
    let distinct: Vec<TagId> = dedupe_ids(tag_ids);
    if distinct.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; distinct.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT uuid FROM tags WHERE uuid IN ({placeholders});"
    ))?;
    let mut rows = stmt.query(params_from_iter(distinct.iter().map(Uuid::to_string)))?;

    let mut found = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        found.insert(parse_uuid(&uuid_text, "tags.uuid")?);
    }

    Ok(distinct
        .into_iter()
        .filter(|id| !found.contains(id))
        .collect())
}

/// Replaces the whole tag-link set for one article: delete everything, then
/// insert one row per distinct id. An empty slice clears all links.
///
/// Must run inside an active transaction; partial replacement is never
/// observable.
pub fn replace_tag_links(
    conn: &Connection,
    article_id: Uuid,
    tag_ids: &[TagId],
) -> RepoResult<()> {
    let article_text = article_id.to_string();
    conn.execute(
        "DELETE FROM article_tags WHERE article_uuid = ?1;",
        [article_text.as_str()],
    )?;

    for tag_id in dedupe_ids(tag_ids) {
        conn.execute(
            "INSERT INTO article_tags (article_uuid, tag_uuid) VALUES (?1, ?2);",
            params![article_text.as_str(), tag_id.to_string()],
        )?;
    }

    Ok(())
}

/// Returns the tag ids currently linked to one article.
pub fn article_tag_ids(conn: &Connection, article_id: Uuid) -> RepoResult<Vec<TagId>> {
    let mut stmt = conn.prepare(
        "SELECT tag_uuid FROM article_tags WHERE article_uuid = ?1 ORDER BY tag_uuid ASC;",
    )?;
    let mut rows = stmt.query([article_id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        ids.push(parse_uuid(&uuid_text, "article_tags.tag_uuid")?);
    }
    Ok(ids)
}

/// Recomputes one category's post-count as the number of published articles
/// referencing it, and persists the result.
pub fn recount_category(conn: &Connection, category_id: CategoryId) -> RepoResult<()> {
    conn.execute(
        "UPDATE categories
         SET
            post_count = (
                SELECT COUNT(*)
                FROM articles
                WHERE category_uuid = ?1
                  AND is_published = 1
            ),
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        [category_id.to_string()],
    )?;
    Ok(())
}

/// Recomputes one tag's post-count as the number of distinct published
/// articles linked via the junction table, and persists the result.
pub fn recount_tag(conn: &Connection, tag_id: TagId) -> RepoResult<()> {
    conn.execute(
        "UPDATE tags
         SET
            post_count = (
                SELECT COUNT(DISTINCT at.article_uuid)
                FROM article_tags at
                INNER JOIN articles a ON a.uuid = at.article_uuid
                WHERE at.tag_uuid = ?1
                  AND a.is_published = 1
            ),
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        [tag_id.to_string()],
    )?;
    Ok(())
}

/// Order-preserving dedupe for caller-supplied id lists.
pub fn dedupe_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    ids.iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}
