//! Fact/IndexEntry data model, message mapping, and deterministic indexing
//! for the counters engine.
//!
//! This crate has no knowledge of storage or aggregation; it only defines
//! the canonical shapes (`Fact`, `IndexEntry`) and the two pure
//! transformations that produce them (`FactMapper`, `FactIndexer`).

pub mod fact;
pub mod hashing;
pub mod index_entry;
pub mod indexer;
pub mod mapper;
pub mod message;

pub use fact::Fact;
pub use index_entry::{IndexEntry, IndexEntryId, IndexValueMode};
pub use indexer::{FactIndexer, IndexFieldConfig, IndexerError};
pub use mapper::{FactMapper, FieldConfig, FieldType, MapperError};
pub use message::InboundMessage;
