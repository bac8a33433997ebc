use crate::storage::cache;
use crate::storage::document::DocumentCollection;
use crate::storage::path::{fold_name, segments};
use crate::storage::{Corpus, Document, Error, Result, SEPARATOR, UNADDRESSABLE_PREFIX};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Identifies a folder within its corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(usize);

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct FolderNode {
    name: String,
    // Lowercased name for sibling comparison; `name` keeps the authored casing.
    folded: String,
    parent: Option<FolderId>,
    children: Vec<FolderId>,
    // Only set on roots mounted under a namespace.
    namespace: Option<String>,
    documents: DocumentCollection,
}

impl FolderNode {
    fn new(name: &str, parent: Option<FolderId>, namespace: Option<String>) -> Self {
        FolderNode {
            name: name.to_string(),
            folded: fold_name(name),
            parent,
            children: Vec::new(),
            namespace,
            documents: DocumentCollection::default(),
        }
    }
}

/// Arena holding every folder of a corpus.
///
/// Each folder is owned by exactly one parent (or is a root); the `parent` index is only
/// used to compute paths and to find the namespace of the enclosing root. Folders are
/// never removed, so a `FolderId` handed out by this tree stays valid.
#[derive(Debug, Default)]
pub(crate) struct FolderTree {
    nodes: Vec<FolderNode>,
    roots: Vec<FolderId>,
}

impl FolderTree {
    pub(crate) fn add_root(&mut self, name: &str, namespace: Option<String>) -> FolderId {
        let id = FolderId(self.nodes.len());
        self.nodes.push(FolderNode::new(name, None, namespace));
        self.roots.push(id);
        id
    }

    pub(crate) fn roots(&self) -> &[FolderId] {
        &self.roots
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: FolderId) -> &FolderNode {
        &self.nodes[id.0]
    }

    pub(crate) fn name(&self, id: FolderId) -> &str {
        &self.node(id).name
    }

    pub(crate) fn parent(&self, id: FolderId) -> Option<FolderId> {
        self.node(id).parent
    }

    pub(crate) fn children(&self, id: FolderId) -> &[FolderId] {
        &self.node(id).children
    }

    pub(crate) fn own_namespace(&self, id: FolderId) -> Option<&str> {
        self.node(id).namespace.as_deref()
    }

    pub(crate) fn documents(&self, id: FolderId) -> &DocumentCollection {
        &self.node(id).documents
    }

    pub(crate) fn documents_mut(&mut self, id: FolderId) -> &mut DocumentCollection {
        &mut self.nodes[id.0].documents
    }

    /// Returns the first child whose name matches `name` case-insensitively.
    pub(crate) fn find_child(&self, id: FolderId, name: &str) -> Option<FolderId> {
        let folded = fold_name(name);
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|child| self.node(*child).folded == folded)
    }

    fn add_child(&mut self, parent: FolderId, name: &str) -> FolderId {
        let id = FolderId(self.nodes.len());
        self.nodes.push(FolderNode::new(name, Some(parent), None));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Computes the folder path from the live ancestor chain, e.g. `root/a/b/`.
    pub(crate) fn path(&self, id: FolderId) -> String {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        let mut path = String::new();
        for folder in chain.iter().rev() {
            path.push_str(self.name(*folder));
            path.push(SEPARATOR);
        }
        path
    }

    /// Returns the namespace of the enclosing root, if that root is mounted.
    pub(crate) fn namespace(&self, id: FolderId) -> Option<&str> {
        let mut current = id;
        loop {
            if let Some(namespace) = self.own_namespace(current) {
                return Some(namespace);
            }
            current = self.parent(current)?;
        }
    }

    pub(crate) fn corpus_path(&self, id: FolderId) -> String {
        match self.namespace(id) {
            Some(namespace) => format!("{namespace}:{}", self.path(id)),
            None => format!("{UNADDRESSABLE_PREFIX}{}", self.path(id)),
        }
    }

    /// Walks `path` from `start`, optionally creating missing folders.
    ///
    /// A path with separators must begin with the name of `start`; the remaining segments
    /// name descendants. A path without separators names a direct child of `start`. A
    /// trailing separator ends the walk at the folder reached so far.
    ///
    /// The whole path is validated before any folder is created, so a failed resolution
    /// leaves the tree untouched.
    pub(crate) fn resolve(&mut self, start: FolderId, path: &str, create_missing: bool) -> Result<FolderId> {
        let parts: Vec<&str> = segments(path).collect();
        let names = match parts.split_first() {
            Some((own, rest)) if !rest.is_empty() => {
                if fold_name(own) != self.node(start).folded {
                    return Err(Error::InvalidPath(path.to_string()));
                }
                match rest {
                    [init @ .., ""] => init,
                    _ => rest,
                }
            }
            _ => &parts[..],
        };

        if names.iter().any(|name| name.is_empty()) {
            return Err(Error::InvalidPath(path.to_string()));
        }

        let mut current = start;
        for name in names {
            current = match self.find_child(current, name) {
                Some(child) => child,
                None if create_missing => {
                    let child = self.add_child(current, name);
                    debug!("Created folder '{}' under {}", name, current);
                    child
                }
                None => return Err(Error::FolderNotFound(path.to_string())),
            };
        }
        Ok(current)
    }
}

/// A handle to a folder in a [`Corpus`].
///
/// Handles are cheap to clone. Name, path, and namespace are read from the live tree on
/// every call, so they always reflect the folder's current position.
#[derive(Clone)]
pub struct FolderRef {
    pub(crate) corpus: Arc<Corpus>,
    pub(crate) id: FolderId,
}

impl FolderRef {
    pub(crate) fn new(corpus: Arc<Corpus>, id: FolderId) -> Self {
        FolderRef { corpus, id }
    }

    pub fn id(&self) -> FolderId {
        self.id
    }

    /// Returns the corpus this folder belongs to.
    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// Returns the folder name with its original casing.
    pub fn name(&self) -> String {
        self.corpus.tree.read().name(self.id).to_string()
    }

    /// Returns the path from the root down to this folder, ending with a separator.
    pub fn path(&self) -> String {
        self.corpus.tree.read().path(self.id)
    }

    /// Returns the namespace of this folder's root, if it is mounted.
    pub fn namespace(&self) -> Option<String> {
        self.corpus.tree.read().namespace(self.id).map(str::to_string)
    }

    /// Returns the address of this folder: `namespace:path`, or `NULL:/path` when the folder
    /// is not under any namespace.
    pub fn corpus_path(&self) -> String {
        self.corpus.tree.read().corpus_path(self.id)
    }

    pub fn parent(&self) -> Option<FolderRef> {
        let parent = self.corpus.tree.read().parent(self.id)?;
        Some(FolderRef::new(self.corpus.clone(), parent))
    }

    /// Lists the direct child folders in creation order.
    pub fn child_folders(&self) -> Vec<FolderRef> {
        let tree = self.corpus.tree.read();
        tree.children(self.id)
            .iter()
            .map(|child| FolderRef::new(self.corpus.clone(), *child))
            .collect()
    }

    /// Resolves `path` relative to this folder.
    ///
    /// With `create_missing`, folders that do not exist yet are created; otherwise a missing
    /// folder is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the path does not start with this folder's name or
    /// contains an empty segment, and [`Error::FolderNotFound`] if a folder is missing and
    /// `create_missing` is false. Both are also reported as diagnostics.
    #[instrument(skip(self), fields(folder = %self.id))]
    pub fn resolve_folder(&self, path: &str, create_missing: bool) -> Result<FolderRef> {
        let resolved = self.corpus.tree.write().resolve(self.id, path, create_missing);
        match resolved {
            Ok(id) => Ok(FolderRef::new(self.corpus.clone(), id)),
            Err(e) => {
                self.corpus.report_error(&e);
                Err(e)
            }
        }
    }

    /// Resolves a document in this folder by name, loading it on a cache miss.
    ///
    /// `object_path` is the document name, optionally followed by a separator and a path
    /// inside the document; only the name is used here. With `force_reload`, a cached
    /// document is evicted and loaded again. Unsaved changes in the evicted document are
    /// discarded after a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for an empty document name and [`Error::Load`] if the
    /// loader fails. After a failed forced reload the name stays unresolved.
    pub async fn resolve_document(&self, object_path: &str, force_reload: bool) -> Result<Arc<Document>> {
        cache::resolve_document(self, object_path, force_reload).await
    }

    /// Returns the cached document with exactly this name, without loading.
    pub fn document(&self, name: &str) -> Option<Arc<Document>> {
        self.corpus.tree.read().documents(self.id).get(name).cloned()
    }

    /// Lists the cached documents in the order they were added.
    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.corpus.tree.read().documents(self.id).iter().cloned().collect()
    }

    /// Registers a document in this folder, replacing any document of the same name.
    ///
    /// Loaders call this before returning a freshly loaded document.
    pub fn insert_document(&self, document: Document) -> Arc<Document> {
        let document = Arc::new(document);
        let replaced = self.corpus.tree.write().documents_mut(self.id).insert(document.clone());
        if replaced.is_some() {
            debug!("Replaced document '{}' in {}", document.name(), self.id);
        }
        document
    }
}

impl PartialEq for FolderRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.corpus, &other.corpus) && self.id == other.id
    }
}

impl Eq for FolderRef {}

impl fmt::Debug for FolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderRef").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_root(name: &str) -> (FolderTree, FolderId) {
        let mut tree = FolderTree::default();
        let root = tree.add_root(name, Some("adls".to_string()));
        (tree, root)
    }

    #[test]
    fn test_resolve_creates_chain() {
        let (mut tree, root) = tree_with_root("a");
        let c = tree.resolve(root, "a/b/c", true).unwrap();

        assert_eq!(tree.path(c), "a/b/c/");
        assert_eq!(tree.name(c), "c");
        let b = tree.parent(c).unwrap();
        assert_eq!(tree.name(b), "b");
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (mut tree, root) = tree_with_root("a");
        let first = tree.resolve(root, "a/b/c", true).unwrap();
        let count = tree.len();
        let second = tree.resolve(root, "a/b/c", true).unwrap();

        assert_eq!(first, second);
        assert_eq!(tree.len(), count);
        assert_eq!(tree.children(root).len(), 1);
    }

    #[test]
    fn test_resolve_matches_case_insensitively() {
        let (mut tree, root) = tree_with_root("root");
        let original = tree.resolve(root, "root/Schemas/Core/", true).unwrap();
        let found = tree.resolve(root, "ROOT/schemas/CORE/", false).unwrap();

        assert_eq!(original, found);
        assert_eq!(tree.name(found), "Core");
        assert_eq!(tree.path(found), "root/Schemas/Core/");
    }

    #[test]
    fn test_resolve_misaligned_root_leaves_tree_untouched() {
        let (mut tree, root) = tree_with_root("root");
        let result = tree.resolve(root, "other/a/b", true);

        assert!(matches!(result, Err(Error::InvalidPath(p)) if p == "other/a/b"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_resolve_empty_segment_leaves_tree_untouched() {
        let (mut tree, root) = tree_with_root("root");
        let result = tree.resolve(root, "root/a//b", true);

        assert!(matches!(result, Err(Error::InvalidPath(_))));
        assert_eq!(tree.len(), 1);
        assert!(matches!(tree.resolve(root, "", true), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_resolve_missing_without_creation() {
        let (mut tree, root) = tree_with_root("root");
        tree.resolve(root, "root/a/", true).unwrap();
        let result = tree.resolve(root, "root/a/b/c", false);

        assert!(matches!(result, Err(Error::FolderNotFound(p)) if p == "root/a/b/c"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_trailing_separator_stops_at_folder() {
        let (mut tree, root) = tree_with_root("root");
        assert_eq!(tree.resolve(root, "root/", false).unwrap(), root);
        let a = tree.resolve(root, "root/a/", true).unwrap();
        assert_eq!(tree.path(a), "root/a/");
    }

    #[test]
    fn test_single_segment_names_child() {
        let (mut tree, root) = tree_with_root("root");
        assert!(matches!(tree.resolve(root, "child", false), Err(Error::FolderNotFound(_))));
        let child = tree.resolve(root, "child", true).unwrap();
        assert_eq!(tree.parent(child), Some(root));
        assert_eq!(tree.resolve(root, "CHILD", false).unwrap(), child);
    }

    #[test]
    fn test_namespace_is_inherited_from_root() {
        let (mut tree, root) = tree_with_root("root");
        let deep = tree.resolve(root, "root/x/y", true).unwrap();
        assert_eq!(tree.own_namespace(deep), None);
        assert_eq!(tree.namespace(deep), Some("adls"));
        assert_eq!(tree.corpus_path(deep), "adls:root/x/y/");
    }

    #[test]
    fn test_unmounted_root_uses_sentinel() {
        let mut tree = FolderTree::default();
        let root = tree.add_root("root", None);
        assert_eq!(tree.corpus_path(root), "NULL:/root/");
    }
}
