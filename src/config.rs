//! Tunable, compile-time-defaulted constants (spec §6).
//!
//! The teacher keeps `PAGE_SIZE` as a runtime-overridable `AtomicUsize`
//! (`btree::page_cache::PAGE_SIZE`) so tests can shrink pages to force more
//! page boundaries; we do the same here but bundle every knob into one
//! `Config` value instead of scattering atomics, since the extra knobs
//! (string width, pool capacity, lock backoff) are all fixed per-`BufferPool`
//! instance rather than process-global.

/// Default page size in bytes (spec §6).
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default fixed width, in bytes, of a `String` field (spec §3).
pub const DEFAULT_STRING_LENGTH: usize = 32;

/// Default upper bound, in milliseconds, of the randomized lock-wait backoff (spec §4.3).
pub const DEFAULT_LOCK_BACKOFF_MAX_MS: u64 = 30;

/// Bundles the knobs that would otherwise be hardcoded magic numbers through
/// the page/heap-file/buffer-pool stack.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub page_size: usize,
    pub string_length: usize,
    pub lock_backoff_max_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            page_size: DEFAULT_PAGE_SIZE,
            string_length: DEFAULT_STRING_LENGTH,
            lock_backoff_max_ms: DEFAULT_LOCK_BACKOFF_MAX_MS,
        }
    }
}
