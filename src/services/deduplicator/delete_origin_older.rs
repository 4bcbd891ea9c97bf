//! Origin replace-if-newer policy.
//!
//! Like the origin replace policy, but only for configured record types and
//! only when the incoming record is strictly newer than the stored record
//! with the same origin id. Stored records win ties.

use super::base::BaseDeduplicator;
use super::config::DEFAULT_DELETE_ORIGIN_OLDER_TYPES;
use super::delete_origin::{DeleteOriginBase, DeleteOriginProvider};
use super::names::{DELETE_ORIGIN_OLDER_NAME, DELETE_ORIGIN_OLDER_VERSION};
use super::types::Deduplicator;
use crate::Result;
use crate::models::{Data, DataSet, Datum, SelectorOrigin, Selectors};
use crate::observability::RequestContext;
use crate::storage::DataRepository;
use std::collections::HashMap;
use tracing::instrument;

/// Drops filterable records that are not newer than their stored version.
#[derive(Debug, Clone)]
pub struct NewerOriginFilter {
    types: Vec<String>,
}

impl NewerOriginFilter {
    /// Creates a filter over the given record types.
    #[must_use]
    pub const fn new(types: Vec<String>) -> Self {
        Self { types }
    }

    /// Returns the filtered record types.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    fn is_filterable(&self, datum: &dyn Datum) -> bool {
        self.types.iter().any(|t| t == datum.datum_type())
    }

    /// Origin criterion of a filterable record with an origin id.
    fn filterable_origin(&self, datum: &dyn Datum) -> Option<SelectorOrigin> {
        if !self.is_filterable(datum) {
            return None;
        }
        let origin = datum.origin()?;
        Some(SelectorOrigin::new(origin.id()?, origin.time))
    }
}

impl DeleteOriginProvider for NewerOriginFilter {
    fn filter_data(
        &self,
        base: &BaseDeduplicator,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        data: &mut Data,
    ) -> Result<()> {
        let Some(selectors) = self.data_selectors(data) else {
            return Ok(());
        };

        let existing = repository.existing_data_set_data(ctx, data_set, &selectors)?;
        let mut newest: HashMap<&str, &SelectorOrigin> = HashMap::new();
        for origin in existing.origins() {
            let current = newest.entry(origin.id.as_str()).or_insert(origin);
            if origin.newer_than(*current) {
                *current = origin;
            }
        }

        let before = data.len();
        data.retain(|datum| {
            let Some(incoming) = self.filterable_origin(datum.as_ref()) else {
                return true;
            };
            newest
                .get(incoming.id.as_str())
                .is_none_or(|stored| incoming.newer_than(stored))
        });
        base.record_dropped("not_newer_origin", before - data.len());
        Ok(())
    }

    fn data_selectors(&self, data: &[Box<dyn Datum>]) -> Option<Selectors> {
        let selectors: Selectors = data
            .iter()
            .filter_map(|datum| self.filterable_origin(datum.as_ref()))
            .map(crate::models::Selector::Origin)
            .collect();
        if selectors.is_empty() {
            None
        } else {
            Some(selectors)
        }
    }
}

/// Replaces stored records by origin id when the incoming record is newer.
#[derive(Debug, Clone)]
pub struct DeleteOriginOlderDeduplicator {
    inner: DeleteOriginBase,
    filter: NewerOriginFilter,
}

impl DeleteOriginOlderDeduplicator {
    /// Creates the policy filtering the default record types.
    pub fn new() -> Result<Self> {
        Self::with_types(
            DEFAULT_DELETE_ORIGIN_OLDER_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
        )
    }

    /// Creates the policy filtering the given record types.
    pub fn with_types(types: Vec<String>) -> Result<Self> {
        Ok(Self {
            inner: DeleteOriginBase::new(DELETE_ORIGIN_OLDER_NAME, DELETE_ORIGIN_OLDER_VERSION)?,
            filter: NewerOriginFilter::new(types),
        })
    }

    /// Returns the filtered record types.
    #[must_use]
    pub fn types(&self) -> &[String] {
        self.filter.types()
    }
}

impl Deduplicator for DeleteOriginOlderDeduplicator {
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
            .add_data(&self.filter, ctx, repository, data_set, data)
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
