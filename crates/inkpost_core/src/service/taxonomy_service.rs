//! Category/tag use-case service.
//!
//! # Responsibility
//! - Provide CRUD entry points for categories and tags.
//! - Derive slugs from names and re-arbitrate uniqueness on rename.
//!
//! # Invariants
//! - `post_count` is never writable through this service.
//! - Removal fails with `Conflict` while the stored post-count is nonzero.

use crate::model::article::now_epoch_ms;
use crate::model::taxonomy::{Category, Tag};
use crate::repo::taxonomy_repo::TaxonomyRepository;
use crate::repo::{RepoError, RepoResult};
use crate::slug::{slugify, SlugScope};
use log::info;
use uuid::Uuid;

/// Input for creating one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
}

/// Partial category patch; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

/// Taxonomy use-case service over a repository implementation.
pub struct TaxonomyService<R: TaxonomyRepository> {
    repo: R,
}

impl<R: TaxonomyRepository> TaxonomyService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a category with a slug derived from its name.
    pub fn create_category(&mut self, draft: CategoryDraft) -> RepoResult<Category> {
        let slug = self.arbitrate_slug(SlugScope::Category, &draft.name, None)?;
        let now = now_epoch_ms();
        let category = Category {
            uuid: Uuid::new_v4(),
            name: draft.name,
            slug,
            description: draft.description,
            post_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.repo.create_category(&category)?;
        info!(
            "event=category_create module=taxonomy status=ok slug={}",
            category.slug
        );
        self.read_back_category(category.uuid)
    }

    /// Applies a partial patch; renames regenerate the slug.
    pub fn update_category(&mut self, slug: &str, patch: CategoryPatch) -> RepoResult<Category> {
        let mut category = self
            .repo
            .get_category_by_slug(slug)?
            .ok_or_else(|| RepoError::not_found("category", slug))?;

        if let Some(name) = patch.name {
            category.slug =
                self.arbitrate_slug(SlugScope::Category, &name, Some(category.uuid))?;
            category.name = name;
        }
        if let Some(description) = patch.description {
            category.description = description;
        }

        self.repo.update_category(&category)?;
        self.read_back_category(category.uuid)
    }

    /// Removes one category; `Conflict` while its post-count is nonzero.
    pub fn remove_category(&mut self, slug: &str) -> RepoResult<()> {
        let category = self
            .repo
            .get_category_by_slug(slug)?
            .ok_or_else(|| RepoError::not_found("category", slug))?;
        self.repo.delete_category(category.uuid)?;
        info!("event=category_delete module=taxonomy status=ok slug={slug}");
        Ok(())
    }

    pub fn get_category(&self, slug: &str) -> RepoResult<Category> {
        self.repo
            .get_category_by_slug(slug)?
            .ok_or_else(|| RepoError::not_found("category", slug))
    }

    pub fn list_categories(&self) -> RepoResult<Vec<Category>> {
        self.repo.list_categories()
    }

    /// Creates a tag with a slug derived from its name.
    pub fn create_tag(&mut self, name: impl Into<String>) -> RepoResult<Tag> {
        let name = name.into();
        let slug = self.arbitrate_slug(SlugScope::Tag, &name, None)?;
        let now = now_epoch_ms();
        let tag = Tag {
            uuid: Uuid::new_v4(),
            name,
            slug,
            post_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.repo.create_tag(&tag)?;
        info!("event=tag_create module=taxonomy status=ok slug={}", tag.slug);
        self.read_back_tag(tag.uuid)
    }

    /// Renames one tag, regenerating its slug.
    pub fn rename_tag(&mut self, slug: &str, name: impl Into<String>) -> RepoResult<Tag> {
        let mut tag = self
            .repo
            .get_tag_by_slug(slug)?
            .ok_or_else(|| RepoError::not_found("tag", slug))?;

        let name = name.into();
        tag.slug = self.arbitrate_slug(SlugScope::Tag, &name, Some(tag.uuid))?;
        tag.name = name;

        self.repo.update_tag(&tag)?;
        self.read_back_tag(tag.uuid)
    }

    /// Removes one tag; `Conflict` while its post-count is nonzero.
    pub fn remove_tag(&mut self, slug: &str) -> RepoResult<()> {
        let tag = self
            .repo
            .get_tag_by_slug(slug)?
            .ok_or_else(|| RepoError::not_found("tag", slug))?;
        self.repo.delete_tag(tag.uuid)?;
        info!("event=tag_delete module=taxonomy status=ok slug={slug}");
        Ok(())
    }

    pub fn get_tag(&self, slug: &str) -> RepoResult<Tag> {
        self.repo
            .get_tag_by_slug(slug)?
            .ok_or_else(|| RepoError::not_found("tag", slug))
    }

    pub fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        self.repo.list_tags()
    }

    /// Derives a slug from `name` and pre-checks uniqueness within `scope`.
    /// Advisory; the UNIQUE index still decides concurrent races.
    fn arbitrate_slug(
        &self,
        scope: SlugScope,
        name: &str,
        exclude: Option<Uuid>,
    ) -> RepoResult<String> {
        if name.trim().is_empty() {
            return Err(RepoError::Validation("name must not be blank".to_string()));
        }
        let slug = slugify(name);
        if self.repo.slug_in_use(scope, &slug, exclude)? {
            return Err(RepoError::Conflict(format!(
                "{} slug already in use: `{slug}`",
                scope.entity()
            )));
        }
        Ok(slug)
    }

    fn read_back_category(&self, id: Uuid) -> RepoResult<Category> {
        self.repo.get_category(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("category {id} missing in post-write read-back"))
        })
    }

    fn read_back_tag(&self, id: Uuid) -> RepoResult<Tag> {
        self.repo.get_tag(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("tag {id} missing in post-write read-back"))
        })
    }
}
