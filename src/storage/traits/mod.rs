//! Storage backend traits.

mod data;

pub use data::DataRepository;
