//! File-per-document store with atomic, no-clobber commits
//!
//! A document lands at `{directory}/{id}.{extension}` only through a single
//! link/rename of a fully written and synced temporary file created in the
//! same directory. A staged file that is never committed is removed on drop.

use crate::state::{DownloadOutcome, FailureReason};
use crate::storage::error::{StorageError, StorageResult};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Prefix for in-progress files, so they never collide with document names
const STAGING_PREFIX: &str = ".partial-";

/// Result of committing a staged document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// The document is now visible at its final path
    Written,

    /// Another writer got there first; the existing file was left untouched
    AlreadyPresent,
}

/// Durable store keyed by document identifier
#[derive(Debug, Clone)]
pub struct DocumentStore {
    directory: PathBuf,
    extension: String,
    min_document_bytes: usize,
}

impl DocumentStore {
    /// Opens the store, creating the directory if needed
    ///
    /// Fails if the directory cannot be created or written to; callers treat
    /// this as a fatal pre-flight error.
    pub fn open(
        directory: impl Into<PathBuf>,
        extension: impl Into<String>,
        min_document_bytes: usize,
    ) -> StorageResult<Self> {
        let directory = directory.into();

        std::fs::create_dir_all(&directory).map_err(|source| StorageError::CreateDir {
            path: directory.clone(),
            source,
        })?;

        // Probe with the same mechanism documents are written with
        NamedTempFile::with_prefix_in(STAGING_PREFIX, &directory).map_err(|source| {
            StorageError::NotWritable {
                path: directory.clone(),
                source,
            }
        })?;

        Ok(Self {
            directory,
            extension: extension.into(),
            min_document_bytes,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn min_document_bytes(&self) -> usize {
        self.min_document_bytes
    }

    /// Maps an identifier to its final path
    pub fn path_for(&self, id: &str) -> StorageResult<PathBuf> {
        if !is_valid_id(id) {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(self.directory.join(format!("{}.{}", id, self.extension)))
    }

    /// Checks whether a document for `id` is already stored
    ///
    /// Invalid identifiers are never stored, so they report `false`.
    pub async fn exists(&self, id: &str) -> bool {
        match self.path_for(id) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Validates and writes `body` to a temporary file next to its final path
    ///
    /// Nothing is visible at the final path until [`StagedDocument::commit`].
    pub fn stage(&self, id: &str, body: &[u8]) -> StorageResult<StagedDocument> {
        let final_path = self.path_for(id)?;

        if body.len() < self.min_document_bytes {
            return Err(StorageError::TooShort {
                len: body.len(),
                min: self.min_document_bytes,
            });
        }

        let write_err = |source| StorageError::Write {
            path: final_path.clone(),
            source,
        };

        let mut temp =
            NamedTempFile::with_prefix_in(STAGING_PREFIX, &self.directory).map_err(write_err)?;
        temp.write_all(body).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;

        Ok(StagedDocument { temp, final_path })
    }

    /// Stores one document body, blocking the calling thread
    pub fn store_blocking(&self, id: &str, body: &[u8]) -> DownloadOutcome {
        let staged = match self.stage(id, body) {
            Ok(staged) => staged,
            Err(e) => return DownloadOutcome::Failed(failure_reason(e)),
        };

        match staged.commit() {
            Ok(Commit::Written) => DownloadOutcome::Written,
            Ok(Commit::AlreadyPresent) => DownloadOutcome::Skipped,
            Err(e) => DownloadOutcome::Failed(failure_reason(e)),
        }
    }

    /// Stores one document body on the blocking thread pool
    pub async fn store(&self, id: &str, body: String) -> DownloadOutcome {
        let store = self.clone();
        let id_owned = id.to_string();

        match tokio::task::spawn_blocking(move || store.store_blocking(&id_owned, body.as_bytes()))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => DownloadOutcome::Failed(FailureReason::Write(
                StorageError::Task(e.to_string()).to_string(),
            )),
        }
    }
}

/// A fully written temporary file waiting to be moved into place
#[derive(Debug)]
pub struct StagedDocument {
    temp: NamedTempFile,
    final_path: PathBuf,
}

impl StagedDocument {
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically moves the staged file to its final path
    ///
    /// Never replaces an existing document.
    pub fn commit(self) -> StorageResult<Commit> {
        match self.temp.persist_noclobber(&self.final_path) {
            Ok(_) => Ok(Commit::Written),
            // The temp file is dropped and removed with the error
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(Commit::AlreadyPresent),
            Err(e) => Err(StorageError::Write {
                path: self.final_path,
                source: e.error,
            }),
        }
    }
}

/// Identifiers are restricted to `[A-Za-z0-9_]+`
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn failure_reason(err: StorageError) -> FailureReason {
    match err {
        StorageError::InvalidId(_) => FailureReason::InvalidId,
        StorageError::TooShort { len, min } => FailureReason::TooShort { len, min },
        other => FailureReason::Write(other.to_string()),
    }
}
