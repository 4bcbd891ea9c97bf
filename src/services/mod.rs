//! Business logic services.
//!
//! Deduplicators orchestrate the data repository and decide what each upload
//! writes.

pub mod deduplicator;
