//! Pass-through policy.
//!
//! Writes every record as uploaded. Used for data that needs no
//! deduplication, such as streams already deduplicated upstream.

use super::base::BaseDeduplicator;
use super::names::{NONE_NAME, NONE_VERSION};
use super::types::Deduplicator;
use crate::Result;
use crate::models::{Data, DataSet, Selectors};
use crate::observability::RequestContext;
use crate::storage::DataRepository;
use tracing::instrument;

/// Policy that applies the default lifecycle unchanged.
#[derive(Debug, Clone)]
pub struct NoneDeduplicator {
    base: BaseDeduplicator,
}

impl NoneDeduplicator {
    /// Creates the policy.
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: BaseDeduplicator::new(NONE_NAME, NONE_VERSION)?,
        })
    }
}

impl Deduplicator for NoneDeduplicator {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn version(&self) -> &str {
        self.base.version()
    }

    fn claims(&self, data_set: &DataSet) -> Result<bool> {
        self.base.claims(data_set)
    }

    fn owns(&self, data_set: &DataSet) -> Result<bool> {
        self.base.owns(data_set)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn open(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<DataSet> {
        self.base.open(ctx, repository, data_set)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id(), count = data.len()))]
    fn add_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        data: &mut Data,
    ) -> Result<()> {
        self.base.add_data(ctx, repository, data_set, data)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn delete_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        self.base.delete_data(ctx, repository, data_set, selectors)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn close(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()> {
        self.base.close(ctx, repository, data_set)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn delete(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()> {
        self.base.delete(ctx, repository, data_set)
    }
}
