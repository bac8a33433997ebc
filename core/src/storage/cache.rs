//! Name-to-document resolution with forced reload.
//!
//! The cache itself is the per-folder [`DocumentCollection`](super::document::DocumentCollection).
//! This module adds the load path: cache check, a reservation of the (folder, name) key, the
//! discard warning, eviction, and a single shared load per key so concurrent requests never
//! invoke the loader twice.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, instrument};

use crate::storage::path::split_document_path;
use crate::storage::{
    Corpus, Diagnostic, DiagnosticCode, Document, Error, FolderId, FolderRef, LoadError, Result,
};

type LoadOutcome = std::result::Result<Arc<Document>, Arc<LoadError>>;

pub(crate) type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DocumentKey {
    folder: FolderId,
    name: String,
}

enum Lookup {
    Cached(Arc<Document>),
    Pending(SharedLoad),
}

#[instrument(skip(folder), fields(folder_id = %folder.id))]
pub(crate) async fn resolve_document(folder: &FolderRef, object_path: &str, force_reload: bool) -> Result<Arc<Document>> {
    let corpus: &Corpus = &folder.corpus;
    let (name, _) = split_document_path(object_path);
    if name.is_empty() {
        let e = Error::InvalidPath(object_path.to_string());
        corpus.report_error(&e);
        return Err(e);
    }

    let key = DocumentKey { folder: folder.id, name: name.to_string() };
    let waiter_key = key.clone();

    let lookup = {
        // Lock order: in-flight map, then tree.
        let mut in_flight = corpus.in_flight.lock();
        if let Some(pending) = in_flight.get(&key) {
            debug!("Joining in-flight load");
            Lookup::Pending(pending.clone())
        } else {
            let cached = if force_reload {
                None
            } else {
                corpus.tree.read().documents(folder.id).get(name).cloned()
            };
            match cached {
                Some(doc) => Lookup::Cached(doc),
                None => {
                    // Reserves the key; eviction and loading happen once the load is polled.
                    let pending = load(folder.clone(), key.clone(), force_reload)
                        .boxed()
                        .shared();
                    in_flight.insert(key, pending.clone());
                    Lookup::Pending(pending)
                }
            }
        }
    };

    match lookup {
        Lookup::Cached(doc) => {
            debug!("Cache hit");
            Ok(doc)
        }
        Lookup::Pending(pending) => {
            let waiter = Waiter { corpus, key: waiter_key, pending, finished: false };
            waiter.wait().await.map_err(|source| Error::Load {
                document: name.to_string(),
                source,
            })
        }
    }
}

/// A caller's handle on an in-flight load.
///
/// Dropping the last waiter before the load finishes abandons the load and frees its key,
/// so the next request for the same document starts over.
struct Waiter<'a> {
    corpus: &'a Corpus,
    key: DocumentKey,
    pending: SharedLoad,
    finished: bool,
}

impl Waiter<'_> {
    async fn wait(mut self) -> LoadOutcome {
        let outcome = (&mut self.pending).await;
        self.finished = true;
        outcome
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let abandoned = {
            let mut in_flight = self.corpus.in_flight.lock();
            // One count for the map entry, one for this waiter.
            let last = in_flight
                .get(&self.key)
                .is_some_and(|entry| entry.ptr_eq(&self.pending) && entry.strong_count() == Some(2));
            if last { in_flight.remove(&self.key) } else { None }
        };
        if abandoned.is_some() {
            debug!("Abandoned load of '{}' in {}", self.key.name, self.key.folder);
        }
    }
}

async fn load(folder: FolderRef, key: DocumentKey, force_reload: bool) -> LoadOutcome {
    let corpus = &folder.corpus;
    let name = key.name.as_str();

    let cached = corpus.tree.read().documents(key.folder).get(name).cloned();
    let existing = match cached {
        Some(doc) if !force_reload => {
            corpus.in_flight.lock().remove(&key);
            return Ok(doc);
        }
        Some(doc) => {
            // No locks held here, and the dirty instance is still cached.
            if doc.is_dirty() {
                corpus.report(Diagnostic::warning(
                    DiagnosticCode::DiscardingChanges,
                    format!("{}{}", folder.corpus_path(), name),
                    format!("discarding changes in document: {name}"),
                ));
            }
            corpus.tree.write().documents_mut(key.folder).remove(name);
            debug!("Evicted cached document '{}' for reload", name);
            Some(doc)
        }
        None => None,
    };

    debug!("Loading document '{}' into {}", name, key.folder);
    let result = corpus.loader.load(&folder, name, existing).await;
    // The loader has registered the document by now, so later requests hit the cache.
    corpus.in_flight.lock().remove(&key);
    match &result {
        Ok(doc) => debug!("Loaded document '{}' ({})", name, doc.id()),
        Err(e) => debug!("Loader failed for '{}': {}", name, e),
    }
    result.map_err(Arc::new)
}
