//! Folio core: a namespace-rooted tree of folders that addresses, lazily loads, and caches
//! schema documents by path, independent of where the documents are stored.

pub mod config;
pub mod event;
pub mod storage;
