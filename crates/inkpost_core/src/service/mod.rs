//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep boundary layers decoupled from storage details.
//!
//! # Invariants
//! - Validation failures are raised before any mutation starts.
//! - Service APIs never bypass repository transaction contracts.

pub mod content_service;
pub mod taxonomy_service;
