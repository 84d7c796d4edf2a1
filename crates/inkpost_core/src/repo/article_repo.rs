//! Article repository: read composition and transactional write internals.
//!
//! # Responsibility
//! - Compose filtered/sorted/paginated listing queries from one predicate
//!   builder, independent of which optional filters are present.
//! - Assemble the detail aggregate (article + category + tags).
//! - Run every create/update/delete as one immediate transaction that also
//!   replaces tag links and recounts affected counters.
//! - Provide the atomic view-count increment primitive.
//!
//! # Invariants
//! - Listing page and total come from two queries over the *same* predicate;
//!   they are not snapshot-consistent under concurrent writers.
//! - Sort keys are restricted to a fixed allow-list; no caller text is ever
//!   interpolated into SQL.
//! - Counter recounts happen inside the same transaction as the triggering
//!   write, so a commit is never visible with stale counters.

use crate::model::article::{Article, ArticleAggregate, ArticleId};
use crate::model::taxonomy::{Category, CategoryId, Tag, TagId};
use crate::repo::associations::{
    article_tag_ids, category_exists, dedupe_ids, missing_tags, recount_category, recount_tag,
    replace_tag_links, slug_in_use,
};
use crate::repo::taxonomy_repo::{parse_category_row, CATEGORY_SELECT_SQL};
use crate::repo::{constraint_to_conflict, parse_uuid, RepoError, RepoResult};
use crate::slug::SlugScope;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};

const ARTICLE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    slug,
    body,
    summary,
    cover_path,
    is_published,
    view_count,
    category_uuid,
    author_id,
    published_at,
    created_at,
    updated_at
FROM articles";

const LIMIT_MIN: u32 = 1;
const LIMIT_MAX: u32 = 100;

/// Allow-listed sort keys for article listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    PublishedAt,
    Title,
    ViewCount,
}

impl SortKey {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::PublishedAt => "published_at",
            Self::Title => "title",
            Self::ViewCount => "view_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Sort selection; defaults to `created_at DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArticleSort {
    pub key: SortKey,
    pub dir: SortDir,
}

/// Listing query options. Every filter is independently optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleListQuery {
    /// Equality filter on the publish flag.
    pub published: Option<bool>,
    /// Equality filter on the owning category.
    pub category_id: Option<CategoryId>,
    /// Equality filter on the author reference.
    pub author_id: Option<String>,
    /// Membership filter via the junction table.
    pub tag_id: Option<TagId>,
    /// Partial match across title/body/summary (OR semantics).
    pub search: Option<String>,
    pub sort: ArticleSort,
    /// 1-based page number; values below 1 are treated as 1.
    pub page: u32,
    /// Page size, clamped to `[1, 100]`.
    pub limit: u32,
}

impl Default for ArticleListQuery {
    fn default() -> Self {
        Self {
            published: None,
            category_id: None,
            author_id: None,
            tag_id: None,
            search: None,
            sort: ArticleSort::default(),
            page: 1,
            limit: 20,
        }
    }
}

/// One listing page plus the full matching-set size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleListPage {
    pub items: Vec<ArticleAggregate>,
    /// Size of the whole matching set, from an independent count query.
    pub total: u64,
}

/// Repository interface the content service orchestrates against.
pub trait ContentRepository {
    fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Article>>;
    /// Assembles article + category + tags for one slug.
    fn get_detail(&self, slug: &str) -> RepoResult<Option<ArticleAggregate>>;
    /// Assembles the aggregate by id; used for post-write read-back.
    fn get_aggregate(&self, id: ArticleId) -> RepoResult<Option<ArticleAggregate>>;
    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<ArticleListPage>;
    fn article_tag_ids(&self, id: ArticleId) -> RepoResult<Vec<TagId>>;
    fn category_exists(&self, id: CategoryId) -> RepoResult<bool>;
    /// Batch existence check; returns every unknown id.
    fn missing_tags(&self, tag_ids: &[TagId]) -> RepoResult<Vec<TagId>>;
    fn slug_in_use(&self, slug: &str, exclude: Option<ArticleId>) -> RepoResult<bool>;

    /// Inserts the article and its tag links, recounting the touched
    /// category/tags, all in one transaction.
    fn create_article(&mut self, article: &Article, tag_ids: &[TagId]) -> RepoResult<()>;
    /// Persists the patched row; `tag_ids = None` leaves links unchanged.
    /// Recounts both prior and current category/tag sets.
    fn update_article(
        &mut self,
        article: &Article,
        tag_ids: Option<&[TagId]>,
        prior_category: CategoryId,
        prior_tags: &[TagId],
    ) -> RepoResult<()>;
    /// Removes tag links and the row, recounting the prior relations.
    fn delete_article(&mut self, article: &Article, prior_tags: &[TagId]) -> RepoResult<()>;

    /// Storage-level atomic `view_count + 1`; never read-modify-write.
    fn increment_views(&self, id: ArticleId) -> RepoResult<()>;
}

/// SQLite-backed article repository.
pub struct SqliteArticleRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteArticleRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl ContentRepository for SqliteArticleRepository<'_> {
    fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_article_row(row)?));
        }
        Ok(None)
    }

    fn get_detail(&self, slug: &str) -> RepoResult<Option<ArticleAggregate>> {
        match self.find_by_slug(slug)? {
            Some(article) => Ok(Some(assemble_aggregate(self.conn, article)?)),
            None => Ok(None),
        }
    }

    fn get_aggregate(&self, id: ArticleId) -> RepoResult<Option<ArticleAggregate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let article = parse_article_row(row)?;
            return Ok(Some(assemble_aggregate(self.conn, article)?));
        }
        Ok(None)
    }

    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<ArticleListPage> {
        let (filter_sql, bind_values) = build_filter_clause(query);

        // Independent count over the same predicate; not guaranteed to see
        // the exact snapshot of the page query under concurrent writers.
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM articles{filter_sql};"),
            params_from_iter(bind_values.clone()),
            |row| row.get(0),
        )?;

        let limit = query.limit.clamp(LIMIT_MIN, LIMIT_MAX);
        let page = query.page.max(1);
        let offset = i64::from(page - 1) * i64::from(limit);

        let mut page_sql = format!("{ARTICLE_SELECT_SQL}{filter_sql}");
        page_sql.push_str(&format!(
            " ORDER BY {} {}, uuid ASC LIMIT ? OFFSET ?",
            query.sort.key.column(),
            query.sort.dir.keyword()
        ));
        let mut page_binds = bind_values;
        page_binds.push(Value::Integer(i64::from(limit)));
        page_binds.push(Value::Integer(offset));

        let mut stmt = self.conn.prepare(&page_sql)?;
        let mut rows = stmt.query(params_from_iter(page_binds))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let article = parse_article_row(row)?;
            items.push(assemble_aggregate(self.conn, article)?);
        }

        Ok(ArticleListPage {
            items,
            total: total.max(0) as u64,
        })
    }

    fn article_tag_ids(&self, id: ArticleId) -> RepoResult<Vec<TagId>> {
        article_tag_ids(self.conn, id)
    }

    fn category_exists(&self, id: CategoryId) -> RepoResult<bool> {
        category_exists(self.conn, id)
    }

    fn missing_tags(&self, tag_ids: &[TagId]) -> RepoResult<Vec<TagId>> {
        missing_tags(self.conn, tag_ids)
    }

    fn slug_in_use(&self, slug: &str, exclude: Option<ArticleId>) -> RepoResult<bool> {
        slug_in_use(self.conn, SlugScope::Article, slug, exclude)
    }

    fn create_article(&mut self, article: &Article, tag_ids: &[TagId]) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO articles (
                uuid,
                title,
                slug,
                body,
                summary,
                cover_path,
                is_published,
                view_count,
                category_uuid,
                author_id,
                published_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                article.uuid.to_string(),
                article.title.as_str(),
                article.slug.as_str(),
                article.body.as_str(),
                article.summary.as_deref(),
                article.cover_path.as_deref(),
                crate::repo::bool_to_int(article.is_published),
                article.view_count,
                article.category_id.to_string(),
                article.author_id.as_str(),
                article.published_at,
                article.created_at,
                article.updated_at,
            ],
        )
        .map_err(|err| {
            constraint_to_conflict(err, || {
                format!("article slug already in use: `{}`", article.slug)
            })
        })?;

        replace_tag_links(&tx, article.uuid, tag_ids)?;
        recount_category(&tx, article.category_id)?;
        for tag_id in dedupe_ids(tag_ids) {
            recount_tag(&tx, tag_id)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn update_article(
        &mut self,
        article: &Article,
        tag_ids: Option<&[TagId]>,
        prior_category: CategoryId,
        prior_tags: &[TagId],
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx
            .execute(
                "UPDATE articles
                 SET
                    title = ?1,
                    slug = ?2,
                    body = ?3,
                    summary = ?4,
                    cover_path = ?5,
                    is_published = ?6,
                    category_uuid = ?7,
                    published_at = ?8,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?9;",
                params![
                    article.title.as_str(),
                    article.slug.as_str(),
                    article.body.as_str(),
                    article.summary.as_deref(),
                    article.cover_path.as_deref(),
                    crate::repo::bool_to_int(article.is_published),
                    article.category_id.to_string(),
                    article.published_at,
                    article.uuid.to_string(),
                ],
            )
            .map_err(|err| {
                constraint_to_conflict(err, || {
                    format!("article slug already in use: `{}`", article.slug)
                })
            })?;

        if changed == 0 {
            return Err(RepoError::not_found("article", article.uuid));
        }

        if let Some(tag_ids) = tag_ids {
            replace_tag_links(&tx, article.uuid, tag_ids)?;
        }

        // Both sides of a re-categorization/re-tag may have lost or gained a
        // member; recount the union of prior and current relation sets.
        recount_category(&tx, prior_category)?;
        if article.category_id != prior_category {
            recount_category(&tx, article.category_id)?;
        }
        let mut touched_tags = prior_tags.to_vec();
        if let Some(tag_ids) = tag_ids {
            touched_tags.extend_from_slice(tag_ids);
        }
        for tag_id in dedupe_ids(&touched_tags) {
            recount_tag(&tx, tag_id)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_article(&mut self, article: &Article, prior_tags: &[TagId]) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM article_tags WHERE article_uuid = ?1;",
            [article.uuid.to_string()],
        )?;
        let changed = tx.execute(
            "DELETE FROM articles WHERE uuid = ?1;",
            [article.uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("article", article.uuid));
        }

        recount_category(&tx, article.category_id)?;
        for tag_id in dedupe_ids(prior_tags) {
            recount_tag(&tx, tag_id)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn increment_views(&self, id: ArticleId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE articles
             SET view_count = view_count + 1
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("article", id));
        }
        Ok(())
    }
}

/// Folds the optional filters into one `WHERE` clause plus its bind values.
///
/// Always emits a single predicate expression; which filters are present only
/// changes the clauses appended, never the query shape around them.
fn build_filter_clause(query: &ArticleListQuery) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(published) = query.published {
        sql.push_str(" AND is_published = ?");
        bind_values.push(Value::Integer(crate::repo::bool_to_int(published)));
    }

    if let Some(category_id) = query.category_id {
        sql.push_str(" AND category_uuid = ?");
        bind_values.push(Value::Text(category_id.to_string()));
    }

    if let Some(author_id) = query.author_id.as_ref() {
        sql.push_str(" AND author_id = ?");
        bind_values.push(Value::Text(author_id.clone()));
    }

    if let Some(tag_id) = query.tag_id {
        sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM article_tags at
                WHERE at.article_uuid = articles.uuid
                  AND at.tag_uuid = ?
            )",
        );
        bind_values.push(Value::Text(tag_id.to_string()));
    }

    if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
        sql.push_str(
            " AND (title LIKE ? OR body LIKE ? OR IFNULL(summary, '') LIKE ?)",
        );
        let pattern = format!("%{}%", search.trim());
        for _ in 0..3 {
            bind_values.push(Value::Text(pattern.clone()));
        }
    }

    (sql, bind_values)
}

fn assemble_aggregate(conn: &Connection, article: Article) -> RepoResult<ArticleAggregate> {
    let category = load_category(conn, article.category_id)?;
    let tags = load_tags_for_article(conn, &article.uuid.to_string())?;
    Ok(ArticleAggregate {
        article,
        category,
        tags,
    })
}

fn load_category(conn: &Connection, id: CategoryId) -> RepoResult<Category> {
    let mut stmt = conn.prepare(&format!("{CATEGORY_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_category_row(row);
    }
    // The foreign key makes this unreachable for well-formed databases.
    Err(RepoError::InvalidData(format!(
        "article references missing category {id}"
    )))
}

fn load_tags_for_article(conn: &Connection, article_uuid: &str) -> RepoResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT
            t.uuid,
            t.name,
            t.slug,
            t.post_count,
            t.created_at,
            t.updated_at
         FROM article_tags at
         INNER JOIN tags t ON t.uuid = at.tag_uuid
         WHERE at.article_uuid = ?1
         ORDER BY t.name ASC;",
    )?;
    let mut rows = stmt.query([article_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(crate::repo::taxonomy_repo::parse_tag_row(row)?);
    }
    Ok(tags)
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let uuid_text: String = row.get("uuid")?;
    let category_text: String = row.get("category_uuid")?;
    let is_published = match row.get::<_, i64>("is_published")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_published value `{other}` in articles.is_published"
            )));
        }
    };

    Ok(Article {
        uuid: parse_uuid(&uuid_text, "articles.uuid")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        body: row.get("body")?,
        summary: row.get("summary")?,
        cover_path: row.get("cover_path")?,
        is_published,
        view_count: row.get("view_count")?,
        category_id: parse_uuid(&category_text, "articles.category_uuid")?,
        author_id: row.get("author_id")?,
        published_at: row.get("published_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
