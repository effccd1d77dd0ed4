//! Concrete, strongly-typed page identity (spec §9 redesign flag: "Any-typed
//! lock keys" — the source uses an untyped bag for page identity; here it is
//! a concrete, hashable, totally-ordered value type).

use std::fmt;
use std::sync::Arc;

/// Identifies a heap file by its canonical path, cheaply cloneable so it can
/// be used as a map key without re-allocating a `String` on every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(Arc<str>);

impl FileId {
    pub fn new(path: impl AsRef<str>) -> Self {
        FileId(Arc::from(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(file, page_no)` — the buffer pool's cache key and the lock manager's
/// lock key (spec §3/§9).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey {
    pub file: FileId,
    pub page_no: u32,
}

impl PageKey {
    pub fn new(file: FileId, page_no: u32) -> Self {
        PageKey { file, page_no }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.page_no)
    }
}
