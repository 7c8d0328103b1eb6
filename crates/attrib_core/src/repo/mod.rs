//! File access layer for input and overlay files.
//!
//! # Responsibility
//! - Define the file store contract used by the import pipeline.
//! - Keep JSON decoding and wire shapes inside the repository boundary.
//!
//! # Invariants
//! - Decoders return wire shapes only; normalization is a service concern.
//! - Writes are durable when the call returns.

pub mod project_files;
pub mod raw;
