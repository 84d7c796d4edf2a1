//! Article write coordination and read use-cases.
//!
//! # Responsibility
//! - Validate referenced categories/tags and arbitrate slugs before any
//!   mutation starts.
//! - Resolve partial patches against the loaded row, including publish-flag
//!   transitions.
//! - Serve detail reads with a best-effort view-count increment.
//!
//! # Invariants
//! - Pre-transaction validation failures leave no partial state.
//! - `tag_ids = None` in a patch means "leave the tag set unchanged";
//!   `Some(vec![])` clears it.
//! - View-count increment failures are logged and discarded; the read
//!   response still reflects the post-increment value optimistically.

use crate::model::article::{Article, ArticleAggregate, ArticleId};
use crate::model::taxonomy::{CategoryId, TagId};
use crate::repo::article_repo::{ArticleListPage, ArticleListQuery, ContentRepository};
use crate::repo::{RepoError, RepoResult};
use crate::slug::slugify;
use log::{info, warn};

/// Input for creating one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub cover_path: Option<String>,
    pub published: bool,
    pub category_id: CategoryId,
    pub author_id: String,
    pub tag_ids: Vec<TagId>,
}

/// Partial patch; `None` fields are left unchanged.
///
/// Nullable columns use a nested `Option`: the outer level is presence, the
/// inner level is the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub summary: Option<Option<String>>,
    pub cover_path: Option<Option<String>>,
    pub published: Option<bool>,
    pub category_id: Option<CategoryId>,
    /// `Some` replaces the full tag set; `Some(vec![])` clears it.
    pub tag_ids: Option<Vec<TagId>>,
}

/// Article use-case service over a content repository.
pub struct ContentService<R: ContentRepository> {
    repo: R,
}

impl<R: ContentRepository> ContentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one article together with its tag links.
    ///
    /// Validation order: category exists, all tags exist, slug free; the
    /// first violation fails the call with no mutation. The slug pre-check is
    /// advisory; a losing race still surfaces as `Conflict` from the insert.
    pub fn create_article(&mut self, draft: ArticleDraft) -> RepoResult<ArticleAggregate> {
        require_non_blank(&draft.title, "title")?;
        require_non_blank(&draft.body, "body")?;

        if !self.repo.category_exists(draft.category_id)? {
            return Err(RepoError::Validation(format!(
                "unknown category id: {}",
                draft.category_id
            )));
        }
        let missing = self.repo.missing_tags(&draft.tag_ids)?;
        if !missing.is_empty() {
            return Err(RepoError::Validation(format!(
                "unknown tag ids: {}",
                join_ids(&missing)
            )));
        }

        let slug = slugify(&draft.title);
        if self.repo.slug_in_use(&slug, None)? {
            return Err(RepoError::Conflict(format!(
                "article slug already in use: `{slug}`"
            )));
        }

        let mut article = Article::new(
            draft.title,
            slug,
            draft.body,
            draft.category_id,
            draft.author_id,
        );
        article.summary = draft.summary;
        article.cover_path = draft.cover_path;
        article.set_published(draft.published);

        self.repo.create_article(&article, &draft.tag_ids)?;
        info!(
            "event=article_create module=content status=ok slug={} published={}",
            article.slug, article.is_published
        );

        self.read_back(article.uuid)
    }

    /// Applies a partial patch to the article identified by `slug`.
    pub fn update_article(
        &mut self,
        slug: &str,
        patch: ArticlePatch,
    ) -> RepoResult<ArticleAggregate> {
        let mut article = self
            .repo
            .find_by_slug(slug)?
            .ok_or_else(|| RepoError::not_found("article", slug))?;
        let prior_category = article.category_id;
        let prior_tags = self.repo.article_tag_ids(article.uuid)?;

        if let Some(title) = patch.title {
            require_non_blank(&title, "title")?;
            let new_slug = slugify(&title);
            if self.repo.slug_in_use(&new_slug, Some(article.uuid))? {
                return Err(RepoError::Conflict(format!(
                    "article slug already in use: `{new_slug}`"
                )));
            }
            article.title = title;
            article.slug = new_slug;
        }
        if let Some(body) = patch.body {
            require_non_blank(&body, "body")?;
            article.body = body;
        }
        if let Some(summary) = patch.summary {
            article.summary = summary;
        }
        if let Some(cover_path) = patch.cover_path {
            article.cover_path = cover_path;
        }
        if let Some(category_id) = patch.category_id {
            if !self.repo.category_exists(category_id)? {
                return Err(RepoError::Validation(format!(
                    "unknown category id: {category_id}"
                )));
            }
            article.category_id = category_id;
        }
        if let Some(tag_ids) = patch.tag_ids.as_deref() {
            let missing = self.repo.missing_tags(tag_ids)?;
            if !missing.is_empty() {
                return Err(RepoError::Validation(format!(
                    "unknown tag ids: {}",
                    join_ids(&missing)
                )));
            }
        }
        if let Some(published) = patch.published {
            article.set_published(published);
        }

        self.repo.update_article(
            &article,
            patch.tag_ids.as_deref(),
            prior_category,
            &prior_tags,
        )?;
        info!(
            "event=article_update module=content status=ok slug={}",
            article.slug
        );

        self.read_back(article.uuid)
    }

    /// Deletes the article identified by `slug` along with its tag links.
    pub fn delete_article(&mut self, slug: &str) -> RepoResult<()> {
        let article = self
            .repo
            .find_by_slug(slug)?
            .ok_or_else(|| RepoError::not_found("article", slug))?;
        let prior_tags = self.repo.article_tag_ids(article.uuid)?;

        self.repo.delete_article(&article, &prior_tags)?;
        info!("event=article_delete module=content status=ok slug={slug}");
        Ok(())
    }

    /// Serves the detail aggregate for one slug and bumps its view counter.
    ///
    /// The increment is an atomic storage add executed after the read; its
    /// failure never blocks the response and is never retried.
    pub fn get_article(&self, slug: &str) -> RepoResult<ArticleAggregate> {
        let mut aggregate = self
            .repo
            .get_detail(slug)?
            .ok_or_else(|| RepoError::not_found("article", slug))?;

        if let Err(err) = self.repo.increment_views(aggregate.article.uuid) {
            warn!(
                "event=view_count module=content status=error article={} error={err}",
                aggregate.article.uuid
            );
        }
        // Optimistic: reflect the post-increment value even if the persisted
        // add has not been confirmed.
        aggregate.article.view_count += 1;

        Ok(aggregate)
    }

    /// Lists articles with filters, sorting and pagination.
    pub fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<ArticleListPage> {
        self.repo.list_articles(query)
    }

    fn read_back(&self, id: ArticleId) -> RepoResult<ArticleAggregate> {
        self.repo.get_aggregate(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("article {id} missing in post-write read-back"))
        })
    }
}

fn require_non_blank(value: &str, field: &'static str) -> RepoResult<()> {
    if value.trim().is_empty() {
        return Err(RepoError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

fn join_ids(ids: &[TagId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
