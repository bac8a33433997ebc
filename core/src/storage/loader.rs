use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::{Document, FolderRef};

/// Errors produced by a [`PersistenceLoader`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Malformed document '{name}': {reason}")]
    Malformed { name: String, reason: String },

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Turns stored content into documents.
///
/// Implementations locate `name` inside `folder` (typically through the folder's namespace),
/// parse it, and register the result with [`FolderRef::insert_document`] before returning
/// the registered handle. `existing` is the instance being replaced on a forced reload.
#[async_trait]
pub trait PersistenceLoader: Send + Sync {
    async fn load(
        &self,
        folder: &FolderRef,
        name: &str,
        existing: Option<Arc<Document>>,
    ) -> Result<Arc<Document>, LoadError>;
}
