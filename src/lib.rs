//! Bounded-concurrency statistics engine for MediaWiki XML dump archives.
//!
//! Each input is an already-decompressed byte stream of dump XML. A fixed
//! pool of worker threads streams every archive through an event-driven page
//! extractor, folds the extracted pages into four shared tables (title words,
//! body words, size buckets, publication years) and renders a fixed-format
//! text report once all inputs are consumed.
//!
//! The entry point is [`collect`]; [`collect_with`] additionally exposes the
//! pool's shutdown escalation windows.

pub mod collect;
pub mod error;
pub mod extract;
pub mod pool;
pub mod report;
pub mod stats;

pub use collect::{collect, collect_with};
pub use error::CollectError;
pub use pool::{CancelToken, ShutdownConfig, WorkerPool, MAX_THREADS, MIN_THREADS};
pub use stats::{DumpStats, Page};
