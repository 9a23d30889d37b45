//! siftdex — a small, self-contained TF-IDF ranked full-text search engine
//! over a corpus of HTML documents dropped into a dump directory.
//!
//! ## Architecture
//! - Text Extractor: raw dump file bytes → (URL, normalized token stream).
//! - Staging Matrix: per-document term→frequency accumulator.
//! - Persistent Index Store: SQLite-backed terms/documents/postings/stats.
//! - TF-IDF Engine: batch recomputation of every posting's score.
//! - Ingestion Pipeline / Spider: walks the dump directory into the store.
//! - Shadow-Swap Coordinator: reindexes a cloned store, then swaps it in
//!   live without interrupting queries.
//! - Query Evaluator: multi-term ranked lookup.
//! - Worker Pool: fixed-size thread pool dispatching query work, with the
//!   pause/drain primitives the coordinator uses to quiesce readers.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod pool;
pub mod query;
pub mod service;
pub mod staging;
pub mod store;
pub mod tfidf;
pub mod types;

pub use config::Config;
pub use coordinator::{Coordinator, Mode};
pub use error::{Error, Result};
pub use pool::Pool;
pub use service::Service;
pub use store::IndexStore;
pub use types::{Document, DocumentId, Posting, SearchHit, Term, TermId};
