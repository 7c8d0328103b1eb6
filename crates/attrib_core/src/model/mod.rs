//! Domain model for attribution import.
//!
//! # Responsibility
//! - Define canonical, strongly-typed records produced at the parse boundary.
//! - Keep the external and manual id namespaces disjoint by type.
//!
//! # Invariants
//! - Loosely-typed decoded records never appear in this module.

pub mod attribution;
pub mod project;
pub mod resource;
