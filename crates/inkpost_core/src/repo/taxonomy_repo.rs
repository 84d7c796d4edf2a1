//! Category/tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD persistence for categories and tags.
//! - Guard deletes against live references.
//!
//! # Invariants
//! - `post_count` is written only by the recount helpers in
//!   [`crate::repo::associations`]; create/update here never touch it.
//! - Deleting a category/tag with nonzero post-count fails with `Conflict`.
//! - Name/slug UNIQUE violations surface as `Conflict`.

use crate::model::taxonomy::{Category, CategoryId, Tag, TagId};
use crate::repo::{constraint_to_conflict, parse_uuid, RepoError, RepoResult};
use crate::slug::SlugScope;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

pub(crate) const CATEGORY_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    slug,
    description,
    post_count,
    created_at,
    updated_at
FROM categories";

pub(crate) const TAG_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    slug,
    post_count,
    created_at,
    updated_at
FROM tags";

/// Repository interface for category/tag persistence.
pub trait TaxonomyRepository {
    fn create_category(&mut self, category: &Category) -> RepoResult<()>;
    /// Updates name/slug/description; `post_count` is never written here.
    fn update_category(&mut self, category: &Category) -> RepoResult<()>;
    /// Deletes one category, failing with `Conflict` while referenced.
    fn delete_category(&mut self, id: CategoryId) -> RepoResult<()>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn get_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>>;
    /// Lists all categories ordered by name.
    fn list_categories(&self) -> RepoResult<Vec<Category>>;

    fn create_tag(&mut self, tag: &Tag) -> RepoResult<()>;
    fn update_tag(&mut self, tag: &Tag) -> RepoResult<()>;
    /// Deletes one tag, failing with `Conflict` while referenced.
    fn delete_tag(&mut self, id: TagId) -> RepoResult<()>;
    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>>;
    fn get_tag_by_slug(&self, slug: &str) -> RepoResult<Option<Tag>>;
    /// Lists all tags ordered by name.
    fn list_tags(&self) -> RepoResult<Vec<Tag>>;

    /// Advisory slug uniqueness pre-check within one scope.
    fn slug_in_use(&self, scope: SlugScope, slug: &str, exclude: Option<Uuid>)
        -> RepoResult<bool>;
}

/// SQLite-backed taxonomy repository.
pub struct SqliteTaxonomyRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteTaxonomyRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl TaxonomyRepository for SqliteTaxonomyRepository<'_> {
    fn create_category(&mut self, category: &Category) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO categories (uuid, name, slug, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    category.uuid.to_string(),
                    category.name.as_str(),
                    category.slug.as_str(),
                    category.description.as_deref(),
                    category.created_at,
                    category.updated_at,
                ],
            )
            .map_err(|err| {
                constraint_to_conflict(err, || {
                    format!("category name/slug already in use: `{}`", category.name)
                })
            })?;
        Ok(())
    }

    fn update_category(&mut self, category: &Category) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE categories
                 SET
                    name = ?1,
                    slug = ?2,
                    description = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?4;",
                params![
                    category.name.as_str(),
                    category.slug.as_str(),
                    category.description.as_deref(),
                    category.uuid.to_string(),
                ],
            )
            .map_err(|err| {
                constraint_to_conflict(err, || {
                    format!("category name/slug already in use: `{}`", category.name)
                })
            })?;

        if changed == 0 {
            return Err(RepoError::not_found("category", category.uuid));
        }
        Ok(())
    }

    fn delete_category(&mut self, id: CategoryId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        delete_counted_row(&tx, SlugScope::Category, id)?;
        tx.commit()?;
        Ok(())
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        fetch_category(self.conn, "uuid", &id.to_string())
    }

    fn get_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        fetch_category(self.conn, "slug", slug)
    }

    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} ORDER BY name ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn create_tag(&mut self, tag: &Tag) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO tags (uuid, name, slug, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    tag.uuid.to_string(),
                    tag.name.as_str(),
                    tag.slug.as_str(),
                    tag.created_at,
                    tag.updated_at,
                ],
            )
            .map_err(|err| {
                constraint_to_conflict(err, || {
                    format!("tag name/slug already in use: `{}`", tag.name)
                })
            })?;
        Ok(())
    }

    fn update_tag(&mut self, tag: &Tag) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE tags
                 SET
                    name = ?1,
                    slug = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?3;",
                params![tag.name.as_str(), tag.slug.as_str(), tag.uuid.to_string()],
            )
            .map_err(|err| {
                constraint_to_conflict(err, || {
                    format!("tag name/slug already in use: `{}`", tag.name)
                })
            })?;

        if changed == 0 {
            return Err(RepoError::not_found("tag", tag.uuid));
        }
        Ok(())
    }

    fn delete_tag(&mut self, id: TagId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        delete_counted_row(&tx, SlugScope::Tag, id)?;
        tx.commit()?;
        Ok(())
    }

    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        fetch_tag(self.conn, "uuid", &id.to_string())
    }

    fn get_tag_by_slug(&self, slug: &str) -> RepoResult<Option<Tag>> {
        fetch_tag(self.conn, "slug", slug)
    }

    fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TAG_SELECT_SQL} ORDER BY name ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn slug_in_use(
        &self,
        scope: SlugScope,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> RepoResult<bool> {
        crate::repo::associations::slug_in_use(self.conn, scope, slug, exclude)
    }
}

/// Deletes a category/tag row inside the caller's transaction, first checking
/// its stored post-count. Draft articles keep the row referenced without
/// counting; those deletes fail on the foreign key and map to `Conflict` too.
fn delete_counted_row(tx: &Transaction<'_>, scope: SlugScope, id: Uuid) -> RepoResult<()> {
    let id_text = id.to_string();
    let post_count: Option<i64> = tx
        .query_row(
            &format!("SELECT post_count FROM {} WHERE uuid = ?1;", scope.table()),
            [id_text.as_str()],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    let Some(post_count) = post_count else {
        return Err(RepoError::not_found(scope.entity(), id));
    };
    if post_count > 0 {
        return Err(RepoError::Conflict(format!(
            "{} still referenced by {post_count} published article(s)",
            scope.entity()
        )));
    }

    tx.execute(
        &format!("DELETE FROM {} WHERE uuid = ?1;", scope.table()),
        [id_text.as_str()],
    )
    .map_err(|err| {
        constraint_to_conflict(err, || {
            format!("{} still referenced by existing articles", scope.entity())
        })
    })?;
    Ok(())
}

fn fetch_category(conn: &Connection, column: &str, key: &str) -> RepoResult<Option<Category>> {
    let mut stmt = conn.prepare(&format!("{CATEGORY_SELECT_SQL} WHERE {column} = ?1;"))?;
    let mut rows = stmt.query([key])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_category_row(row)?));
    }
    Ok(None)
}

fn fetch_tag(conn: &Connection, column: &str, key: &str) -> RepoResult<Option<Tag>> {
    let mut stmt = conn.prepare(&format!("{TAG_SELECT_SQL} WHERE {column} = ?1;"))?;
    let mut rows = stmt.query([key])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_tag_row(row)?));
    }
    Ok(None)
}

pub(crate) fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Category {
        uuid: parse_uuid(&uuid_text, "categories.uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        post_count: row.get("post_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Tag {
        uuid: parse_uuid(&uuid_text, "tags.uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        post_count: row.get("post_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
