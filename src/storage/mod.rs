//! Storage layer abstraction.
//!
//! Deduplicators depend only on [`DataRepository`]. The crate ships an
//! in-memory implementation for tests and local development; production
//! hosts supply their own backed by a document store.

// Allow significant_drop_tightening - guards are held for the whole update.
#![allow(clippy::significant_drop_tightening)]

pub mod memory;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use memory::{InMemoryDataRepository, StoredDatum};
pub use traits::DataRepository;
