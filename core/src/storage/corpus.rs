use crate::config::CorpusConfig;
use crate::event::define_event_listeners;
use crate::storage::cache::{DocumentKey, SharedLoad};
use crate::storage::folder::FolderTree;
use crate::storage::path::{parse_corpus_path, split_folder_and_document};
use crate::storage::{
    Diagnostic, DiagnosticCode, Document, Error, FolderRef, PersistenceLoader, Result, NAMESPACE_DELIMITER,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

define_event_listeners!{ CorpusEvents {
    diagnostic: Diagnostic,
}}

/// The addressable universe of folders and documents.
///
/// A corpus owns the folder tree and the loader used to fill folders with documents.
/// Addressing errors and data-loss warnings are dispatched to the listeners in
/// [`Corpus::on`] and mirrored into the tracing log.
pub struct Corpus {
    pub(crate) tree: RwLock<FolderTree>,
    pub(crate) loader: Arc<dyn PersistenceLoader>,
    pub(crate) in_flight: Mutex<HashMap<DocumentKey, SharedLoad>>,
    default_namespace: Option<String>,
    pub on: CorpusEvents,
}

impl Corpus {
    /// Creates an empty corpus that loads documents through `loader`.
    pub fn new(loader: Arc<dyn PersistenceLoader>) -> Arc<Corpus> {
        Self::with_default_namespace(loader, None)
    }

    fn with_default_namespace(loader: Arc<dyn PersistenceLoader>, default_namespace: Option<String>) -> Arc<Corpus> {
        Arc::new(Corpus {
            tree: RwLock::new(FolderTree::default()),
            loader,
            in_flight: Mutex::new(HashMap::new()),
            default_namespace,
            on: CorpusEvents::new(),
        })
    }

    /// Creates a corpus and mounts every root listed in `config`.
    ///
    /// # Errors
    ///
    /// Fails if two mounts share a namespace or a mount has an invalid name.
    #[instrument(skip_all, fields(mounts = config.mounts.len()))]
    pub fn from_config(config: &CorpusConfig, loader: Arc<dyn PersistenceLoader>) -> Result<Arc<Corpus>> {
        let corpus = Self::with_default_namespace(loader, config.default_namespace.clone());
        for mount in &config.mounts {
            corpus.mount(&mount.namespace, &mount.root)?;
        }
        debug!("Corpus created from configuration");
        Ok(corpus)
    }

    /// Returns the namespace used for corpus paths that do not name one.
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Adds a root folder for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamespaceConflict`] if the namespace is already mounted and
    /// [`Error::InvalidPath`] if the namespace or root name is empty or malformed.
    pub fn mount(self: &Arc<Self>, namespace: &str, root_name: &str) -> Result<FolderRef> {
        if namespace.is_empty() || namespace.contains(NAMESPACE_DELIMITER) {
            return Err(Error::InvalidPath(format!("{namespace}{NAMESPACE_DELIMITER}")));
        }
        validate_root_name(root_name)?;

        let mut tree = self.tree.write();
        let taken = tree.roots().iter().any(|root| tree.own_namespace(*root) == Some(namespace));
        if taken {
            return Err(Error::NamespaceConflict(namespace.to_string()));
        }
        let id = tree.add_root(root_name, Some(namespace.to_string()));
        debug!("Mounted '{}' at namespace '{}'", root_name, namespace);
        Ok(FolderRef::new(self.clone(), id))
    }

    /// Adds a root folder that is not under any namespace.
    ///
    /// Folders below it are addressed with the `NULL:/` sentinel and cannot be reached
    /// through [`Corpus::fetch_folder`].
    pub fn add_root(self: &Arc<Self>, name: &str) -> Result<FolderRef> {
        validate_root_name(name)?;
        let id = self.tree.write().add_root(name, None);
        Ok(FolderRef::new(self.clone(), id))
    }

    /// Returns the root mounted at `namespace`.
    pub fn root(self: &Arc<Self>, namespace: &str) -> Option<FolderRef> {
        let tree = self.tree.read();
        tree.roots()
            .iter()
            .find(|root| tree.own_namespace(**root) == Some(namespace))
            .map(|root| FolderRef::new(self.clone(), *root))
    }

    /// Lists all roots, mounted or not, in the order they were added.
    pub fn roots(self: &Arc<Self>) -> Vec<FolderRef> {
        let tree = self.tree.read();
        tree.roots().iter().map(|root| FolderRef::new(self.clone(), *root)).collect()
    }

    /// Resolves a folder from a corpus path such as `adls:root/a/b/`.
    ///
    /// The path after the namespace starts with the root folder's name.
    #[instrument(skip(self))]
    pub fn fetch_folder(self: &Arc<Self>, corpus_path: &str, create_missing: bool) -> Result<FolderRef> {
        let (root, path) = self.root_for(corpus_path)?;
        root.resolve_folder(path, create_missing)
    }

    /// Resolves a document from a corpus path such as `adls:root/a/entity.json`.
    ///
    /// The last segment is the document name; the folders before it are created if they do
    /// not exist yet.
    #[instrument(skip(self))]
    pub async fn fetch_document(self: &Arc<Self>, corpus_path: &str, force_reload: bool) -> Result<Arc<Document>> {
        let (root, path) = self.root_for(corpus_path)?;
        let (folder_path, document_name) = split_folder_and_document(path);
        if folder_path.is_empty() || document_name.is_empty() {
            let e = Error::InvalidPath(corpus_path.to_string());
            self.report_error(&e);
            return Err(e);
        }
        let folder = root.resolve_folder(folder_path, true)?;
        folder.resolve_document(document_name, force_reload).await
    }

    fn root_for<'p>(self: &Arc<Self>, corpus_path: &'p str) -> Result<(FolderRef, &'p str)> {
        let (namespace, path) = parse_corpus_path(corpus_path);
        let namespace = match namespace.or(self.default_namespace()) {
            Some(namespace) => namespace,
            None => {
                let e = Error::UnknownNamespace(corpus_path.to_string());
                self.report_error(&e);
                return Err(e);
            }
        };
        match self.root(namespace) {
            Some(root) => Ok((root, path)),
            None => {
                let e = Error::UnknownNamespace(namespace.to_string());
                self.report_error(&e);
                Err(e)
            }
        }
    }

    /// Sends a diagnostic to the log and to all registered listeners.
    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        diagnostic.trace();
        self.on.diagnostic.dispatch(&diagnostic);
    }

    /// Reports an addressing error. Other errors are left to the caller.
    pub(crate) fn report_error(&self, error: &Error) {
        let (code, path) = match error {
            Error::InvalidPath(path) => (DiagnosticCode::InvalidPath, path),
            Error::FolderNotFound(path) => (DiagnosticCode::FolderNotFound, path),
            Error::UnknownNamespace(path) => (DiagnosticCode::UnknownNamespace, path),
            _ => return,
        };
        self.report(Diagnostic::error(code, path.clone(), error.to_string()));
    }
}

impl fmt::Debug for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Corpus")
            .field("folders", &self.tree.read().len())
            .field("loads_in_flight", &self.in_flight.lock().len())
            .field("default_namespace", &self.default_namespace)
            .field("on", &self.on)
            .finish_non_exhaustive()
    }
}

fn validate_root_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(crate::storage::SEPARATOR) {
        return Err(Error::InvalidPath(name.to_string()));
    }
    Ok(())
}
