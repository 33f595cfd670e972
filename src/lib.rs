//! Stowage: Content-Addressed File Metadata Archival
//!
//! Walks directory trees, captures per-file metadata (mimetype, content
//! signature, ownership, and for images dimensions plus embedded tags),
//! and persists it in an embedded key-value store keyed by content hash.

pub mod cli;
pub mod config;
pub mod console;
pub mod entry;
pub mod error;
pub mod exif;
pub mod image;
pub mod inspect;
pub mod logging;
pub mod service;
pub mod store;

#[cfg(test)]
mod testdata;
