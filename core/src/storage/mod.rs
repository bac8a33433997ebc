//! Provides the in-memory corpus tree: namespace-rooted folders and the documents cached in them.
//!
//! This module defines how a corpus-relative path is walked through a tree of folders,
//! how folders are created on demand, and how documents are loaded once, cached by name,
//! and invalidated. Parsing of documents and access to physical storage are delegated to a
//! [`PersistenceLoader`] supplied when the [`Corpus`] is created.
//!
//! # Core Concepts
//!
//! *   **[`Corpus`]:** The context owning the folder tree, the loader, and the diagnostic
//!     listeners. Roots are added with [`Corpus::mount`] (tied to a namespace) or
//!     [`Corpus::add_root`] (outside any namespace).
//! *   **[`FolderRef`]:** A handle to one folder in the tree. Folders own their child
//!     folders and their cached documents; a folder has exactly one parent.
//! *   **[`Document`]:** A loaded document. Documents are created by the loader and replaced,
//!     never mutated in place, on forced reload.
//!
//! # Paths
//!
//! Paths use `/` as separator. A folder's path is the names from its root down to the
//! folder, each followed by a separator (`root/a/b/`). Its corpus path prefixes the
//! namespace (`adls:root/a/b/`), or the `NULL:/` sentinel when the folder is not under any
//! namespace. Folder names are matched case-insensitively but stored as authored; document
//! names are matched exactly.
//!
//! # Asynchronous API
//!
//! Folder navigation is synchronous. Document resolution awaits the loader, and at most
//! one load per folder and document name is in flight at any time; concurrent requests
//! for the same name share its result.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use folio_core::storage::{Corpus, Document, FolderRef, LoadError, PersistenceLoader};
//!
//! struct Empty;
//!
//! #[async_trait::async_trait]
//! impl PersistenceLoader for Empty {
//!     async fn load(
//!         &self,
//!         folder: &FolderRef,
//!         name: &str,
//!         _existing: Option<Arc<Document>>,
//!     ) -> Result<Arc<Document>, LoadError> {
//!         Ok(folder.insert_document(Document::new(name, serde_json::Value::Null)))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let corpus = Corpus::new(Arc::new(Empty));
//!     let root = corpus.mount("local", "root")?;
//!
//!     let folder = root.resolve_folder("root/schemas/core/", true)?;
//!     assert_eq!(folder.corpus_path(), "local:root/schemas/core/");
//!
//!     let doc = folder.resolve_document("entity.json", false).await?;
//!     println!("Loaded document {}", doc.id());
//!     Ok(())
//! }
//! ```

pub use self::corpus::{Corpus, CorpusEvents};
pub use self::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticLevel};
pub use self::document::Document;
pub use self::folder::{FolderId, FolderRef};
pub use self::loader::{LoadError, PersistenceLoader};

mod cache;
mod corpus;
mod diagnostic;
mod document;
mod folder;
mod loader;
pub mod path;

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Separator between path segments.
pub const SEPARATOR: char = '/';
/// Delimiter between a namespace and the path in a corpus path.
pub const NAMESPACE_DELIMITER: char = ':';
/// Prefix of corpus paths for folders outside any namespace.
pub const UNADDRESSABLE_PREFIX: &str = "NULL:/";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Folder not found and creation is disallowed: {0}")]
    FolderNotFound(String),

    #[error("No root is mounted for namespace: {0}")]
    UnknownNamespace(String),

    #[error("A root is already mounted for namespace: {0}")]
    NamespaceConflict(String),

    #[error("Failed to load document '{document}'")]
    Load {
        document: String,
        #[source]
        source: Arc<LoadError>,
    },

    #[error("Corpus configuration file is missing or invalid: {0}")]
    InvalidConfig(PathBuf),

    #[error("Configuration serialization error")]
    Config(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is an addressing failure: a malformed path, a missing folder, or an
    /// unmounted namespace.
    pub fn is_addressing(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath(_) | Error::FolderNotFound(_) | Error::UnknownNamespace(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
