//! Small shared type aliases, kept in their own module the way the teacher
//! separates `SmallResult`/`ConcurrentHashMap` from the rest of the tree.

use crate::error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Result alias for operations that only ever fail, never return a value.
pub type StorageResult = Result<()>;
