//! Splitting of corpus-relative paths into segments.
//!
//! Every separator is significant: `a//b` yields the segments `a`, `` and `b`. Callers
//! decide what an empty segment means (folder resolution rejects it).

use crate::storage::{NAMESPACE_DELIMITER, SEPARATOR};

/// Splits `path` at the first separator.
///
/// Returns the segment before the separator and the remainder after it, or the whole
/// string and `None` when no separator remains.
pub fn split_first(path: &str) -> (&str, Option<&str>) {
    match path.find(SEPARATOR) {
        Some(idx) => (&path[..idx], Some(&path[idx + SEPARATOR.len_utf8()..])),
        None => (path, None),
    }
}

/// Iterator over the segments of a path, produced by repeated [`split_first`].
///
/// An empty input yields a single empty segment.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    rest: Option<&'a str>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.rest.take()?;
        let (segment, remainder) = split_first(current);
        self.rest = remainder;
        Some(segment)
    }
}

/// Returns the segments of `path` in order.
pub fn segments(path: &str) -> Segments<'_> {
    Segments { rest: Some(path) }
}

/// Splits an object path into a document name and the sub-path addressing content inside
/// that document (empty when the path names only the document).
pub fn split_document_path(object_path: &str) -> (&str, &str) {
    let (name, rest) = split_first(object_path);
    (name, rest.unwrap_or(""))
}

/// Splits a folder-plus-document path at its last separator.
///
/// `root/a/doc.json` becomes (`root/a/`, `doc.json`); a path without separators has an
/// empty folder part.
pub fn split_folder_and_document(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(idx) => path.split_at(idx + SEPARATOR.len_utf8()),
        None => ("", path),
    }
}

/// Splits a corpus path of the form `namespace:path` into its parts.
///
/// A single separator directly after the delimiter is dropped, so `adls:/root/` and
/// `adls:root/` address the same folder. A path without a delimiter has no namespace.
pub fn parse_corpus_path(corpus_path: &str) -> (Option<&str>, &str) {
    match corpus_path.split_once(NAMESPACE_DELIMITER) {
        Some((namespace, path)) => {
            let path = path.strip_prefix(SEPARATOR).unwrap_or(path);
            (Some(namespace), path)
        }
        None => (None, corpus_path),
    }
}

/// Case-folded form of a folder name, used for sibling comparison.
pub(crate) fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_first() {
        assert_eq!(split_first("a/b/c"), ("a", Some("b/c")));
        assert_eq!(split_first("a/"), ("a", Some("")));
        assert_eq!(split_first("leaf"), ("leaf", None));
        assert_eq!(split_first(""), ("", None));
    }

    #[test]
    fn test_segments_keep_every_boundary() {
        let parts: Vec<_> = segments("a//b/").collect();
        assert_eq!(parts, vec!["a", "", "b", ""]);
    }

    #[test]
    fn test_segments_of_empty_input() {
        let parts: Vec<_> = segments("").collect();
        assert_eq!(parts, vec![""]);
    }

    #[test]
    fn test_split_document_path() {
        assert_eq!(split_document_path("doc.json"), ("doc.json", ""));
        assert_eq!(split_document_path("doc.json/Entity/attr"), ("doc.json", "Entity/attr"));
    }

    #[test]
    fn test_split_folder_and_document() {
        assert_eq!(split_folder_and_document("root/a/doc.json"), ("root/a/", "doc.json"));
        assert_eq!(split_folder_and_document("doc.json"), ("", "doc.json"));
        assert_eq!(split_folder_and_document("root/"), ("root/", ""));
    }

    #[test]
    fn test_parse_corpus_path() {
        assert_eq!(parse_corpus_path("adls:root/a"), (Some("adls"), "root/a"));
        assert_eq!(parse_corpus_path("adls:/root/a"), (Some("adls"), "root/a"));
        assert_eq!(parse_corpus_path("root/a"), (None, "root/a"));
    }

    #[test]
    fn test_fold_name_is_case_insensitive() {
        assert_eq!(fold_name("Schemas"), fold_name("SCHEMAS"));
        assert_ne!(fold_name("Schemas"), fold_name("Schema"));
    }
}
