//! Provenance tracking: which layer last wrote each subtree.
//!
//! Keys are normalized paths (`"."` for the root, `".a.b"` below it). A merge
//! records its label at every level it visits, so an entry names the most
//! recent writer of the subtree rooted there, not necessarily of each leaf.

use std::collections::BTreeMap;

use crate::path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    entries: BTreeMap<String, String>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: &str, label: &str) {
        self.entries.insert(path::normalize(path), label.to_string());
    }

    /// Last writer of `path`, accepting either `"a.b"` or `".a.b"`.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(&path::normalize(path)).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
