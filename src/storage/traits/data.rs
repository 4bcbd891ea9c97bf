//! Data repository trait consumed by the deduplicators.
//!
//! The repository is the system of record for data sets and their records.
//! Deduplicators never hold state between calls; every decision is made from
//! what the repository reports.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Notes |
//! |---------|----------|-------|
//! | `InMemoryDataRepository` | Testing, development | `RwLock`-guarded maps, no persistence |
//!
//! # Error Modes and Guarantees
//!
//! Implementations report failures as [`crate::Error::Repository`]. The
//! engine returns them to the caller unchanged and never retries.
//!
//! Every method receives the caller's [`RequestContext`]; implementations
//! should check it before starting I/O and bound their I/O by its deadline.
//!
//! ## Selector scope
//!
//! | Selector | Matches |
//! |----------|---------|
//! | `Id` | records of the data set with that server id |
//! | `Origin` | records of the data set with that origin id |
//! | `Deduplicator` | records of the owning user with that identity hash |
//!
//! ## Record states
//!
//! | Operation | Effect on matched records |
//! |-----------|---------------------------|
//! | `delete_data_set_data` | soft delete: inactive, marked deleted |
//! | `archive_data_set_data` | inactive, marked archived, retained |
//! | `destroy_data_set_data` | removed permanently |
//! | `destroy_deleted_data_set_data` | removed permanently if soft deleted |
//! | `activate_data_set_data` | active unless deleted or archived |

use crate::Result;
use crate::models::{DataSet, DataSetUpdate, Datum, Selectors};
use crate::observability::RequestContext;

/// Trait for data storage backends.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn DataRepository>`
/// - Use interior mutability for mutable state
/// - Multi-record operations should be atomic per call where the store allows;
///   the engine tolerates partial failure between calls, not within one
pub trait DataRepository: Send + Sync {
    /// Applies a partial update to a data set and returns the stored result.
    fn update_data_set(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: &DataSetUpdate,
    ) -> Result<DataSet>;

    /// Stores new records in a data set.
    fn create_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        data: &[Box<dyn Datum>],
    ) -> Result<()>;

    /// Soft-deletes matching records of the data set.
    fn delete_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()>;

    /// Permanently removes matching records of the data set.
    fn destroy_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()>;

    /// Permanently removes matching records of the data set that are soft-deleted.
    fn destroy_deleted_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()>;

    /// Deactivates and archives matching records of the data set.
    fn archive_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()>;

    /// Activates matching records of the data set; `None` activates all of them.
    fn activate_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: Option<&Selectors>,
    ) -> Result<()>;

    /// Returns selectors describing the stored records that match.
    ///
    /// Origin selectors in the result carry the stored record's origin time.
    fn existing_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<Selectors>;

    /// Deletes the data set and its records.
    fn delete_data_set(&self, ctx: &RequestContext, data_set: &DataSet) -> Result<()>;

    /// Soft-deletes records of the same user and device held by other data sets.
    fn delete_other_data_set_data(&self, ctx: &RequestContext, data_set: &DataSet) -> Result<()>;

    /// Archives the same device's records in other data sets whose hashes
    /// appear in this data set.
    fn archive_device_data_using_hashes_from_data_set(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
    ) -> Result<()>;

    /// Restores records previously archived on behalf of this data set.
    fn unarchive_device_data_using_hashes_from_data_set(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
    ) -> Result<()>;
}
