//! Device history truncation policy.
//!
//! Some pumps re-export their entire memory on every sync, so each upload
//! supersedes all earlier uploads of the device. Closing the data set
//! removes the device's records from every other data set first, then
//! activates this one. If the removal succeeds but activation fails, the
//! device's history is missing until the next successful upload; duplicated
//! history would be worse.

use super::base::{BaseDeduplicator, validate, validate_data_set};
use super::devices::{TRUNCATE_MANUFACTURERS, is_device_upload, supports_manufacturer};
use super::names::{DEVICE_TRUNCATE_DATA_SET_NAME, DEVICE_TRUNCATE_DATA_SET_VERSION};
use super::types::Deduplicator;
use crate::Result;
use crate::models::{Data, DataSet, Selectors};
use crate::observability::RequestContext;
use crate::storage::DataRepository;
use tracing::instrument;

/// Replaces a device's whole history with the latest upload.
#[derive(Debug, Clone)]
pub struct DeviceTruncateDataSetDeduplicator {
    base: BaseDeduplicator,
}

impl DeviceTruncateDataSetDeduplicator {
    /// Creates the policy.
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: BaseDeduplicator::new(
                DEVICE_TRUNCATE_DATA_SET_NAME,
                DEVICE_TRUNCATE_DATA_SET_VERSION,
            )?,
        })
    }
}

impl Deduplicator for DeviceTruncateDataSetDeduplicator {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn version(&self) -> &str {
        self.base.version()
    }

    fn claims(&self, data_set: &DataSet) -> Result<bool> {
        validate_data_set(data_set)?;
        if !is_device_upload(data_set) {
            return Ok(false);
        }
        if data_set.has_deduplicator_name() {
            return self.base.owns(data_set);
        }

        let manufacturers = data_set.device_manufacturers.as_deref().unwrap_or_default();
        Ok(supports_manufacturer(TRUNCATE_MANUFACTURERS, manufacturers))
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
        validate(ctx, data_set)?;
        repository.delete_other_data_set_data(ctx, data_set)?;
        tracing::info!(data_set_id = %data_set.id, "Truncated other device data sets");
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
