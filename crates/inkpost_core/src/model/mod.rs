//! Domain model for the content engine.
//!
//! # Responsibility
//! - Define canonical records for articles, categories and tags.
//! - Keep denormalized counters visible but read-only for callers.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - `post_count` fields are mutated only by aggregate recounts, never by
//!   caller input.

pub mod article;
pub mod taxonomy;
