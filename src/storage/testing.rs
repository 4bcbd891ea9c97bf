//! Repository double that records calls and injects failures.

use crate::models::{DataSet, DataSetUpdate, Datum, Selectors};
use crate::observability::RequestContext;
use crate::storage::{DataRepository, InMemoryDataRepository};
use crate::{Error, Result};
use std::sync::Mutex;

/// Wraps [`InMemoryDataRepository`], recording every call by operation name.
#[derive(Debug, Default)]
pub struct RecordingRepository {
    pub inner: InMemoryDataRepository,
    calls: Mutex<Vec<&'static str>>,
    fail_on: Option<&'static str>,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the named operation fail with a repository error.
    #[must_use]
    pub fn fail_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Returns the recorded operation names in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Forgets recorded calls.
    pub fn reset(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(operation);
        }
        if self.fail_on == Some(operation) {
            return Err(Error::Repository {
                operation: operation.to_string(),
                cause: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl DataRepository for RecordingRepository {
    fn update_data_set(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: &DataSetUpdate,
    ) -> Result<DataSet> {
        self.record("update_data_set")?;
        self.inner.update_data_set(ctx, id, update)
    }

    fn create_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        data: &[Box<dyn Datum>],
    ) -> Result<()> {
        self.record("create_data_set_data")?;
        self.inner.create_data_set_data(ctx, data_set, data)
    }

    fn delete_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        self.record("delete_data_set_data")?;
        self.inner.delete_data_set_data(ctx, data_set, selectors)
    }

    fn destroy_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        self.record("destroy_data_set_data")?;
        self.inner.destroy_data_set_data(ctx, data_set, selectors)
    }

    fn destroy_deleted_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        self.record("destroy_deleted_data_set_data")?;
        self.inner
            .destroy_deleted_data_set_data(ctx, data_set, selectors)
    }

    fn archive_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        self.record("archive_data_set_data")?;
        self.inner.archive_data_set_data(ctx, data_set, selectors)
    }

    fn activate_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: Option<&Selectors>,
    ) -> Result<()> {
        self.record("activate_data_set_data")?;
        self.inner.activate_data_set_data(ctx, data_set, selectors)
    }

    fn existing_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<Selectors> {
        self.record("existing_data_set_data")?;
        self.inner.existing_data_set_data(ctx, data_set, selectors)
    }

    fn delete_data_set(&self, ctx: &RequestContext, data_set: &DataSet) -> Result<()> {
        self.record("delete_data_set")?;
        self.inner.delete_data_set(ctx, data_set)
    }

    fn delete_other_data_set_data(&self, ctx: &RequestContext, data_set: &DataSet) -> Result<()> {
        self.record("delete_other_data_set_data")?;
        self.inner.delete_other_data_set_data(ctx, data_set)
    }

    fn archive_device_data_using_hashes_from_data_set(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
    ) -> Result<()> {
        self.record("archive_device_data_using_hashes_from_data_set")?;
        self.inner
            .archive_device_data_using_hashes_from_data_set(ctx, data_set)
    }

    fn unarchive_device_data_using_hashes_from_data_set(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
    ) -> Result<()> {
        self.record("unarchive_device_data_using_hashes_from_data_set")?;
        self.inner
            .unarchive_device_data_using_hashes_from_data_set(ctx, data_set)
    }
}
