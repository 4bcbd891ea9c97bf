//! Data models for tidemark.
//!
//! Data sets, device records, and the selectors used to address stored records.

mod data_set;
mod datum;
pub mod records;
mod selector;

pub use data_set::{DataSet, DataSetType, DataSetUpdate, DeduplicatorDescriptor};
pub use datum::{
    Base, Data, Datum, IDENTITY_TIME_FORMAT, IdentityFieldsVersion, LEGACY_IDENTITY_TIME_FORMAT,
    Origin,
};
pub use records::{Basal, Bolus, Food, Glucose};
pub use selector::{Selector, SelectorOrigin, Selectors};
