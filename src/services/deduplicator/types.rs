//! Deduplicator trait.

use crate::Result;
use crate::models::{Data, DataSet, Selectors};
use crate::observability::RequestContext;
use crate::storage::DataRepository;
use std::fmt;

/// A policy that decides how a data set's records are reconciled with
/// previously stored records.
///
/// Every operation validates its inputs in a fixed order (context, data set,
/// then the operation payload) and issues no repository call until they pass.
/// Repository calls within one operation are sequential and stop at the first
/// failure. Nothing is retried.
///
/// # Lifecycle
///
/// ```text
/// claims ──► open ──► add_data* ──► close
///                 └─► delete_data*   delete
/// ```
///
/// | Method | Purpose |
/// |--------|---------|
/// | `claims` | Should this policy take a new data set? |
/// | `owns` | Is this data set already assigned to this policy (or an alias)? |
/// | `open` | Record ownership on the data set |
/// | `add_data` | Reconcile and write a batch |
/// | `delete_data` | Remove records addressed by selectors |
/// | `close` | Finish the upload and make it visible |
/// | `delete` | Remove the data set |
pub trait Deduplicator: fmt::Debug + Send + Sync {
    /// Reverse-domain name recorded on owned data sets.
    fn name(&self) -> &str;

    /// Semantic version recorded on owned data sets.
    fn version(&self) -> &str;

    /// Returns true if this policy should take ownership of a new data set.
    fn claims(&self, data_set: &DataSet) -> Result<bool>;

    /// Returns true if the data set records this policy's name or one of its
    /// deprecated aliases.
    fn owns(&self, data_set: &DataSet) -> Result<bool>;

    /// Records this policy on the data set and returns the stored data set.
    fn open(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<DataSet>;

    /// Reconciles and writes a batch.
    ///
    /// Records may be stamped, hashed or dropped in place; on success `data`
    /// holds what was written.
    fn add_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        data: &mut Data,
    ) -> Result<()>;

    /// Removes the records addressed by `selectors`.
    fn delete_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()>;

    /// Completes the upload.
    fn close(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()>;

    /// Deletes the data set.
    fn delete(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()>;
}
