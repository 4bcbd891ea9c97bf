//! Origin replace policies.
//!
//! An incoming record carrying an origin id replaces any stored record of the
//! data set with the same origin id. Records without an origin id are always
//! new. Replacement runs as three repository calls:
//!
//! ```text
//! delete_data_set_data(origins)           soft delete the old versions
//! create_data_set_data(batch)             write the new versions
//! destroy_deleted_data_set_data(origins)  drop the soft-deleted old versions
//! ```
//!
//! A failure between steps leaves soft-deleted duplicates behind, never lost
//! data; repeating the call completes it.
//!
//! [`DeleteOriginBase`] carries the shared lifecycle. A [`DeleteOriginProvider`]
//! decides which incoming records survive and which stored records they
//! replace.

use super::base::{BaseDeduplicator, validate, validate_data, validate_selectors};
use super::names::{DELETE_ORIGIN_NAME, DELETE_ORIGIN_VERSION};
use super::types::Deduplicator;
use crate::Result;
use crate::models::{Data, DataSet, Datum, Selectors};
use crate::observability::RequestContext;
use crate::storage::DataRepository;
use tracing::instrument;

/// Strategy plugged into [`DeleteOriginBase::add_data`].
pub trait DeleteOriginProvider: Send + Sync {
    /// Removes incoming records that must not be written.
    fn filter_data(
        &self,
        base: &BaseDeduplicator,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        data: &mut Data,
    ) -> Result<()>;

    /// Selects the stored records replaced by the surviving batch.
    fn data_selectors(&self, data: &[Box<dyn Datum>]) -> Option<Selectors>;
}

/// Replaces every stored record sharing an incoming origin id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceOrigins;

impl DeleteOriginProvider for ReplaceOrigins {
    fn filter_data(
        &self,
        _base: &BaseDeduplicator,
        _ctx: &RequestContext,
        _repository: &dyn DataRepository,
        _data_set: &DataSet,
        _data: &mut Data,
    ) -> Result<()> {
        Ok(())
    }

    fn data_selectors(&self, data: &[Box<dyn Datum>]) -> Option<Selectors> {
        Selectors::from_origins(data)
    }
}

/// Lifecycle shared by the origin replace policies.
///
/// Continuous data sets are visible from the moment they are opened and need
/// no close step. Normal data sets follow the default lifecycle.
#[derive(Debug, Clone)]
pub struct DeleteOriginBase {
    base: BaseDeduplicator,
}

impl DeleteOriginBase {
    /// Creates the shared lifecycle for a policy name and version.
    pub fn new(name: &str, version: &str) -> Result<Self> {
        Ok(Self {
            base: BaseDeduplicator::new(name, version)?,
        })
    }

    /// Returns the underlying base.
    #[must_use]
    pub const fn base(&self) -> &BaseDeduplicator {
        &self.base
    }

    /// Opens the data set, activating continuous data sets immediately.
    pub fn open(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<DataSet> {
        if data_set.has_data_set_type_continuous() && !data_set.active {
            let mut data_set = data_set.clone();
            data_set.active = true;
            return self.base.open(ctx, repository, &data_set);
        }
        self.base.open(ctx, repository, data_set)
    }

    /// Filters the batch through `provider`, then replaces the selected
    /// stored records with the survivors.
    pub fn add_data(
        &self,
        provider: &dyn DeleteOriginProvider,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        data: &mut Data,
    ) -> Result<()> {
        validate_data(ctx, data_set, data)?;

        if data_set.has_data_set_type_continuous() {
            for datum in data.iter_mut() {
                datum.set_active(true);
            }
        }

        provider.filter_data(&self.base, ctx, repository, data_set, data)?;

        if let Some(selectors) = provider.data_selectors(data) {
            tracing::debug!(
                deduplicator = %self.base.name(),
                data_set_id = %data_set.id,
                selectors = selectors.len(),
                "Replacing records by origin"
            );
            repository.delete_data_set_data(ctx, data_set, &selectors)?;
            self.base.write_data(ctx, repository, data_set, data)?;
            repository.destroy_deleted_data_set_data(ctx, data_set, &selectors)?;
        } else {
            self.base.write_data(ctx, repository, data_set, data)?;
        }

        self.base.record_operation("add_data");
        Ok(())
    }

    /// Archives the selected records instead of destroying them.
    pub fn delete_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        validate_selectors(ctx, data_set, selectors)?;
        repository.archive_data_set_data(ctx, data_set, selectors)?;
        self.base.record_operation("delete_data");
        Ok(())
    }

    /// Closes normal data sets; continuous data sets are already active.
    pub fn close(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()> {
        validate(ctx, data_set)?;
        if data_set.has_data_set_type_continuous() {
            self.base.record_operation("close");
            return Ok(());
        }
        self.base.close(ctx, repository, data_set)
    }
}

/// Replaces stored records by origin id, regardless of time.
#[derive(Debug, Clone)]
pub struct DeleteOriginDeduplicator {
    inner: DeleteOriginBase,
}

impl DeleteOriginDeduplicator {
    /// Creates the policy.
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: DeleteOriginBase::new(DELETE_ORIGIN_NAME, DELETE_ORIGIN_VERSION)?,
        })
    }
}

impl Deduplicator for DeleteOriginDeduplicator {
    fn name(&self) -> &str {
        self.inner.base().name()
    }

    fn version(&self) -> &str {
        self.inner.base().version()
    }

    fn claims(&self, data_set: &DataSet) -> Result<bool> {
        self.inner.base().claims(data_set)
    }

    fn owns(&self, data_set: &DataSet) -> Result<bool> {
        self.inner.base().owns(data_set)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn open(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<DataSet> {
        self.inner.open(ctx, repository, data_set)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id(), count = data.len()))]
    fn add_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        data: &mut Data,
    ) -> Result<()> {
        self.inner
            .add_data(&ReplaceOrigins, ctx, repository, data_set, data)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn delete_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        self.inner.delete_data(ctx, repository, data_set, selectors)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn close(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()> {
        self.inner.close(ctx, repository, data_set)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn delete(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()> {
        self.inner.base().delete(ctx, repository, data_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::{DataSetType, Food, Origin, Selector};
    use crate::storage::testing::RecordingRepository;
    use chrono::{TimeZone, Utc};

    fn food(origin: Option<&str>, name: &str) -> Box<dyn Datum> {
        let mut food = Food::new(name, 20.0);
        food.base.origin =
            origin.map(|id| Origin::new(id, Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap()));
        Box::new(food)
    }

    fn setup(data_set: DataSet) -> (RecordingRepository, DataSet) {
        let repository = RecordingRepository::new();
        let data_set = repository.inner.create_data_set(data_set).unwrap();
        (repository, data_set)
    }

    fn stored_names(repository: &RecordingRepository) -> Vec<(Option<String>, bool)> {
        repository
            .inner
            .data_set_data("ds")
            .into_iter()
            .map(|d| (d.base.origin.and_then(|o| o.id), d.base.active))
            .collect()
    }

    #[test]
    fn test_owns_alias() {
        let deduplicator = DeleteOriginDeduplicator::new().unwrap();
        assert!(deduplicator
            .owns(&DataSet::new("ds", "user").with_deduplicator_name("org.tidemark.continuous.origin"))
            .unwrap());
    }

    #[test]
    fn test_open_continuous_activates() {
        let (repository, data_set) =
            setup(DataSet::new("ds", "user").with_type(DataSetType::Continuous));
        let ctx = RequestContext::new();

        let opened = DeleteOriginDeduplicator::new()
            .unwrap()
            .open(&ctx, &repository, &data_set)
            .unwrap();

        assert!(opened.active);
    }

    #[test]
    fn test_open_normal_stays_inactive() {
        let (repository, data_set) = setup(DataSet::new("ds", "user"));
        let ctx = RequestContext::new();

        let opened = DeleteOriginDeduplicator::new()
            .unwrap()
            .open(&ctx, &repository, &data_set)
            .unwrap();

        assert!(!opened.active);
    }

    #[test]
    fn test_add_data_replaces_by_origin() {
        let (repository, data_set) = setup(DataSet::new("ds", "user"));
        let ctx = RequestContext::new();
        let deduplicator = DeleteOriginDeduplicator::new().unwrap();

        let mut first: Data = vec![food(Some("a"), "old"), food(Some("b"), "keep")];
        deduplicator
            .add_data(&ctx, &repository, &data_set, &mut first)
            .unwrap();
        repository.reset();

        let mut second: Data = vec![food(Some("a"), "new"), food(None, "loose")];
        deduplicator
            .add_data(&ctx, &repository, &data_set, &mut second)
            .unwrap();

        assert_eq!(
            repository.calls(),
            vec![
                "delete_data_set_data",
                "create_data_set_data",
                "destroy_deleted_data_set_data"
            ]
        );
        let stored = repository.inner.data_set_data("ds");
        assert_eq!(stored.len(), 3);
        assert_eq!(
            stored
                .iter()
                .filter(|d| d.base.origin.as_ref().and_then(|o| o.id.as_deref()) == Some("a"))
                .count(),
            1
        );
        assert!(stored.iter().all(|d| !d.deleted));
    }

    #[test]
    fn test_add_data_without_origins_just_writes() {
        let (repository, data_set) = setup(DataSet::new("ds", "user"));
        let ctx = RequestContext::new();
        let mut data: Data = vec![food(None, "a"), food(None, "b")];

        DeleteOriginDeduplicator::new()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap();

        assert_eq!(repository.calls(), vec!["create_data_set_data"]);
    }

    #[test]
    fn test_add_data_continuous_activates_records() {
        let (repository, data_set) =
            setup(DataSet::new("ds", "user").with_type(DataSetType::Continuous));
        let ctx = RequestContext::new();
        let mut data: Data = vec![food(Some("a"), "x")];

        DeleteOriginDeduplicator::new()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap();

        assert_eq!(stored_names(&repository), vec![(Some("a".to_string()), true)]);
    }

    #[test]
    fn test_add_data_stops_after_failed_delete() {
        let repository = RecordingRepository::new().fail_on("delete_data_set_data");
        let data_set = repository
            .inner
            .create_data_set(DataSet::new("ds", "user"))
            .unwrap();
        let ctx = RequestContext::new();
        let mut data: Data = vec![food(Some("a"), "x")];

        let err = DeleteOriginDeduplicator::new()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap_err();

        assert!(matches!(err, Error::Repository { .. }));
        assert_eq!(repository.calls(), vec!["delete_data_set_data"]);
    }

    #[test]
    fn test_delete_data_archives() {
        let (repository, data_set) = setup(DataSet::new("ds", "user"));
        let ctx = RequestContext::new();
        let selectors = Selectors::new(vec![Selector::origin("a", None)]);

        DeleteOriginDeduplicator::new()
            .unwrap()
            .delete_data(&ctx, &repository, &data_set, &selectors)
            .unwrap();

        assert_eq!(repository.calls(), vec!["archive_data_set_data"]);
    }

    #[test]
    fn test_close_continuous_is_noop() {
        let (repository, data_set) =
            setup(DataSet::new("ds", "user").with_type(DataSetType::Continuous));
        let ctx = RequestContext::new();

        DeleteOriginDeduplicator::new()
            .unwrap()
            .close(&ctx, &repository, &data_set)
            .unwrap();

        assert!(repository.calls().is_empty());
    }

    #[test]
    fn test_close_normal_uses_default() {
        let (repository, data_set) = setup(DataSet::new("ds", "user"));
        let ctx = RequestContext::new();

        DeleteOriginDeduplicator::new()
            .unwrap()
            .close(&ctx, &repository, &data_set)
            .unwrap();

        assert_eq!(
            repository.calls(),
            vec!["update_data_set", "activate_data_set_data"]
        );
    }
}
