//! Archive access orchestration.
//!
//! [`ObjectArchiveAccess`] is the entry point for protocol handlers: search,
//! paged search, store, metadata retrieval and update, existence checks and
//! deletes. [`AggregateEnricher`] adds the derived study and series attributes
//! to search results as a separate step.

mod access;
mod aggregates;

pub use access::{ObjectArchiveAccess, StoreOutcome};
pub use aggregates::AggregateEnricher;
