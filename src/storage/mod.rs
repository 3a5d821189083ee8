//! Storage module for persisting downloaded documents
//!
//! This module handles:
//! - Mapping document identifiers to files in the output directory
//! - Skip-if-present checks before any network request is made
//! - Content plausibility checks on downloaded bodies
//! - Atomic temp-file-then-rename commits that never overwrite

mod document_store;
mod error;

pub use document_store::{is_valid_id, Commit, DocumentStore, StagedDocument};
pub use error::{StorageError, StorageResult};
