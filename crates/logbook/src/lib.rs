//! Per-character transcript logs for rolelog.
//!
//! The [`LogRouter`] decides which files a transcript lands in; the storage
//! backends decide where those files live.

pub mod fs_backend;
pub mod in_memory;
pub mod router;
pub mod seen;
pub mod target;

pub use fs_backend::FsStorage;
pub use in_memory::InMemoryStorage;
pub use router::{LogRouter, RouteOutcome, format_entry, format_header};
pub use seen::{KeyedLocks, SeenSet};
pub use target::{FALLBACK_LOG, LogTarget, identifier_key};
