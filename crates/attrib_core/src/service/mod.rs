//! Import use-case services.
//!
//! # Responsibility
//! - Normalize decoded records, sanitize references, seed overlays.
//! - Orchestrate the full project load for UI/CLI callers.

pub mod import_service;
pub mod normalize;
pub mod sanitize;
pub mod seed;
