use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use uuid::Uuid;

/// A document loaded into a folder.
///
/// The content is opaque to the corpus tree; only the loader and consumers interpret it.
/// Each instance gets a fresh id, so a reloaded document is distinguishable from the one it
/// replaced even when the content is identical.
pub struct Document {
    name: String,
    id: Uuid,
    dirty: AtomicBool,
    content: Value,
}

impl Document {
    pub fn new(name: impl Into<String>, content: Value) -> Self {
        Document {
            name: name.into(),
            id: Uuid::new_v4(),
            dirty: AtomicBool::new(false),
            content,
        }
    }

    /// Returns the document name as authored. Lookups by name are case-sensitive.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Whether the document has in-memory modifications that were not saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

/// The documents owned by one folder: an ordered list plus a lookup by name.
///
/// Both views are only changed together, so every document in the list has exactly one
/// lookup entry and vice versa.
#[derive(Debug, Default)]
pub(crate) struct DocumentCollection {
    list: Vec<Arc<Document>>,
    lookup: HashMap<String, Arc<Document>>,
}

impl DocumentCollection {
    pub(crate) fn get(&self, name: &str) -> Option<&Arc<Document>> {
        self.lookup.get(name)
    }

    /// Adds a document, replacing any document with the same name.
    pub(crate) fn insert(&mut self, document: Arc<Document>) -> Option<Arc<Document>> {
        let previous = self.remove(document.name());
        self.list.push(document.clone());
        self.lookup.insert(document.name().to_string(), document);
        previous
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Arc<Document>> {
        let removed = self.lookup.remove(name)?;
        self.list.retain(|doc| !Arc::ptr_eq(doc, &removed));
        Some(removed)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(name: &str) -> Arc<Document> {
        Arc::new(Document::new(name, json!({ "name": name })))
    }

    #[test]
    fn test_insert_and_lookup_stay_in_sync() {
        let mut docs = DocumentCollection::default();
        docs.insert(doc("a.json"));
        docs.insert(doc("b.json"));

        assert_eq!(docs.list.len(), 2);
        assert_eq!(docs.lookup.len(), 2);
        assert!(docs.get("a.json").is_some());
        let names: Vec<_> = docs.iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let mut docs = DocumentCollection::default();
        let first = doc("a.json");
        let second = doc("a.json");
        docs.insert(first.clone());

        let replaced = docs.insert(second.clone()).expect("previous entry should be returned");
        assert!(Arc::ptr_eq(&replaced, &first));
        assert_eq!(docs.list.len(), 1);
        assert_eq!(docs.lookup.len(), 1);
        assert!(Arc::ptr_eq(docs.get("a.json").unwrap(), &second));
        assert!(Arc::ptr_eq(docs.iter().next().unwrap(), &second));
    }

    #[test]
    fn test_remove_updates_both_views() {
        let mut docs = DocumentCollection::default();
        docs.insert(doc("a.json"));
        docs.insert(doc("b.json"));

        assert!(docs.remove("a.json").is_some());
        assert!(docs.remove("a.json").is_none());
        assert_eq!(docs.list.len(), 1);
        assert_eq!(docs.lookup.len(), 1);
        assert!(docs.get("a.json").is_none());
        assert_eq!(docs.iter().next().unwrap().name(), "b.json");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut docs = DocumentCollection::default();
        docs.insert(doc("Entity.json"));
        assert!(docs.get("entity.json").is_none());
    }

    #[test]
    fn test_dirty_flag() {
        let document = Document::new("a.json", Value::Null);
        assert!(!document.is_dirty());
        document.mark_dirty();
        assert!(document.is_dirty());
        document.mark_clean();
        assert!(!document.is_dirty());
    }
}
