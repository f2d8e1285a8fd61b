//! `cx-cache` — the subscriber-data cache.
//!
//! [`backend::HssCacheBackend`] is the storage seam (a remote
//! wide-column store in production, [`memory::MemoryBackend`] here);
//! [`processor::CacheProcessor`] serialises operations onto a bounded
//! FIFO worker pool and implements the two-phase progress/success
//! acknowledgement for mutations.

pub mod backend;
pub mod memory;
pub mod processor;

pub use backend::{CacheError, HssCacheBackend};
pub use memory::MemoryBackend;
pub use processor::{CacheProcessor, Completion};
