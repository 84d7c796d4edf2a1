//! Slug derivation and uniqueness scopes.
//!
//! # Responsibility
//! - Derive URL-safe identifiers from display names deterministically.
//! - Name the per-entity uniqueness scopes used for arbitration.
//!
//! # Invariants
//! - `slugify` is a pure function: same input, same output.
//! - Uniqueness pre-checks are advisory; the storage UNIQUE constraint is the
//!   authoritative arbiter under concurrent writers.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid non-slug regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static HYPHEN_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-{2,}").expect("valid hyphen-run regex"));

/// Entity family a slug must be unique within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    Article,
    Category,
    Tag,
}

impl SlugScope {
    /// Table owning the scoped `slug` column.
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Article => "articles",
            Self::Category => "categories",
            Self::Tag => "tags",
        }
    }

    /// Entity label used in error messages.
    pub(crate) fn entity(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }
}

/// Derives a URL-safe slug from a display name.
///
/// Rules: lowercase, strip characters outside `[a-z0-9\s-]`, collapse
/// whitespace to single hyphens, collapse hyphen runs, trim edge hyphens.
///
/// TODO: titles written entirely in non-Latin scripts slugify to the empty
/// string; needs a product decision (transliteration or random suffix) before
/// such titles can be supported.
pub fn slugify(display_name: &str) -> String {
    let lowered = display_name.to_lowercase();
    let stripped = NON_SLUG_RE.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_RE.replace_all(stripped.trim(), "-");
    let collapsed = HYPHEN_RUN_RE.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}
