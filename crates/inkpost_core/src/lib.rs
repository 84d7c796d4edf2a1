//! Content aggregate consistency and query engine.
//! This crate is the single source of truth for business invariants:
//! slug arbitration, article<->tag associations, denormalized post-counts
//! and the filtered/paginated read path.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod slug;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::article::{Article, ArticleAggregate, ArticleId};
pub use model::taxonomy::{Category, CategoryId, Tag, TagId};
pub use repo::article_repo::{
    ArticleListPage, ArticleListQuery, ArticleSort, ContentRepository, SortDir, SortKey,
    SqliteArticleRepository,
};
pub use repo::taxonomy_repo::{SqliteTaxonomyRepository, TaxonomyRepository};
pub use repo::{RepoError, RepoResult};
pub use service::content_service::{ArticleDraft, ArticlePatch, ContentService};
pub use service::taxonomy_service::{CategoryDraft, CategoryPatch, TaxonomyService};
pub use slug::{slugify, SlugScope};
