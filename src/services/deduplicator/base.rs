//! Shared deduplicator behaviour.
//!
//! [`BaseDeduplicator`] holds a policy's validated name and version and
//! implements the default lifecycle. Policies compose it and call into it
//! wherever they keep the default.

use super::names::is_name_or_alias;
use crate::models::{DataSet, DataSetUpdate, Datum, DeduplicatorDescriptor, Selectors};
use crate::observability::RequestContext;
use crate::storage::DataRepository;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Dot-separated lowercase labels, at least two.
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)+$")
        .unwrap_or_else(|_| unreachable!())
});

/// `MAJOR.MINOR.PATCH` with optional pre-release and build metadata.
static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?$",
    )
    .unwrap_or_else(|_| unreachable!())
});

/// Returns true if `name` is a valid reverse-domain deduplicator name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Returns true if `version` is a valid semantic version.
#[must_use]
pub fn is_valid_version(version: &str) -> bool {
    VERSION_PATTERN.is_match(version)
}

/// Default deduplicator lifecycle.
///
/// | Operation | Repository calls |
/// |-----------|------------------|
/// | `open` | `update_data_set(active = data set's, deduplicator = {name, version})` |
/// | `add_data` | `create_data_set_data` |
/// | `delete_data` | `destroy_data_set_data` |
/// | `close` | `update_data_set(active = true)`, then `activate_data_set_data(all)` |
/// | `delete` | `delete_data_set` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDeduplicator {
    name: String,
    version: String,
}

impl BaseDeduplicator {
    /// Creates a base with a validated name and version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeduplicator`] if the name or version is empty
    /// or malformed.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let version = version.into();

        if name.is_empty() {
            return Err(Error::InvalidDeduplicator("name is missing".to_string()));
        }
        if !is_valid_name(&name) {
            return Err(Error::InvalidDeduplicator(format!("name {name:?} is invalid")));
        }
        if version.is_empty() {
            return Err(Error::InvalidDeduplicator("version is missing".to_string()));
        }
        if !is_valid_version(&version) {
            return Err(Error::InvalidDeduplicator(format!(
                "version {version:?} is invalid"
            )));
        }

        Ok(Self { name, version })
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the descriptor recorded on owned data sets.
    #[must_use]
    pub fn descriptor(&self) -> DeduplicatorDescriptor {
        DeduplicatorDescriptor::named(self.name.clone(), self.version.clone())
    }

    /// Defaults to [`Self::owns`].
    pub fn claims(&self, data_set: &DataSet) -> Result<bool> {
        self.owns(data_set)
    }

    /// True if the data set records this name or one of its aliases.
    pub fn owns(&self, data_set: &DataSet) -> Result<bool> {
        validate_data_set(data_set)?;
        Ok(data_set
            .deduplicator_name()
            .is_some_and(|name| is_name_or_alias(&self.name, name)))
    }

    /// Records ownership on the data set.
    ///
    /// A data set already recorded under an alias is migrated to the current
    /// name and version.
    pub fn open(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<DataSet> {
        validate(ctx, data_set)?;
        if let Some(actual) = data_set.deduplicator_name()
            && !is_name_or_alias(&self.name, actual)
        {
            return Err(Error::DataSetUsesDifferentDeduplicator {
                expected: self.name.clone(),
                actual: actual.to_string(),
            });
        }

        let update = DataSetUpdate::new()
            .with_active(data_set.active)
            .with_deduplicator(self.descriptor());
        let opened = repository.update_data_set(ctx, &data_set.id, &update)?;

        tracing::debug!(
            deduplicator = %self.name,
            data_set_id = %data_set.id,
            active = opened.active,
            "Opened data set"
        );
        self.record_operation("open");
        Ok(opened)
    }

    /// Writes the batch unchanged.
    pub fn add_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        data: &[Box<dyn Datum>],
    ) -> Result<()> {
        validate_data(ctx, data_set, data)?;
        self.write_data(ctx, repository, data_set, data)?;
        self.record_operation("add_data");
        Ok(())
    }

    /// Permanently removes the selected records.
    pub fn delete_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        validate_selectors(ctx, data_set, selectors)?;
        repository.destroy_data_set_data(ctx, data_set, selectors)?;
        self.record_operation("delete_data");
        Ok(())
    }

    /// Activates the data set, then all of its records.
    pub fn close(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()> {
        validate(ctx, data_set)?;
        let update = DataSetUpdate::new().with_active(true);
        let closed = repository.update_data_set(ctx, &data_set.id, &update)?;
        repository.activate_data_set_data(ctx, &closed, None)?;

        tracing::debug!(deduplicator = %self.name, data_set_id = %data_set.id, "Closed data set");
        self.record_operation("close");
        Ok(())
    }

    /// Deletes the data set.
    pub fn delete(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()> {
        validate(ctx, data_set)?;
        repository.delete_data_set(ctx, data_set)?;
        self.record_operation("delete");
        Ok(())
    }

    /// Stores records that survived a policy's filtering.
    ///
    /// An empty batch is skipped without a repository call.
    pub(crate) fn write_data(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
        data: &[Box<dyn Datum>],
    ) -> Result<()> {
        if data.is_empty() {
            tracing::debug!(deduplicator = %self.name, data_set_id = %data_set.id, "Nothing to write");
            return Ok(());
        }
        repository.create_data_set_data(ctx, data_set, data)?;
        metrics::counter!(
            "deduplicator_data_written_total",
            "deduplicator" => self.name.clone()
        )
        .increment(data.len() as u64);
        Ok(())
    }

    /// Counts a completed operation.
    pub(crate) fn record_operation(&self, operation: &'static str) {
        metrics::counter!(
            "deduplicator_operations_total",
            "deduplicator" => self.name.clone(),
            "operation" => operation
        )
        .increment(1);
    }

    /// Counts records dropped by a policy.
    pub(crate) fn record_dropped(&self, reason: &'static str, count: usize) {
        if count == 0 {
            return;
        }
        tracing::debug!(deduplicator = %self.name, reason, count, "Dropped records");
        metrics::counter!(
            "deduplicator_data_dropped_total",
            "deduplicator" => self.name.clone(),
            "reason" => reason
        )
        .increment(count as u64);
    }
}

/// Checks the context and the data set.
pub(crate) fn validate(ctx: &RequestContext, data_set: &DataSet) -> Result<()> {
    ctx.check()?;
    validate_data_set(data_set)
}

/// Checks the context, the data set and that the batch is non-empty.
pub(crate) fn validate_data(
    ctx: &RequestContext,
    data_set: &DataSet,
    data: &[Box<dyn Datum>],
) -> Result<()> {
    validate(ctx, data_set)?;
    if data.is_empty() {
        return Err(Error::DataMissing);
    }
    Ok(())
}

/// Checks the context, the data set and that the selector set is non-empty.
pub(crate) fn validate_selectors(
    ctx: &RequestContext,
    data_set: &DataSet,
    selectors: &Selectors,
) -> Result<()> {
    validate(ctx, data_set)?;
    if selectors.is_empty() {
        return Err(Error::SelectorsMissing);
    }
    Ok(())
}

pub(crate) fn validate_data_set(data_set: &DataSet) -> Result<()> {
    if data_set.is_identified() {
        Ok(())
    } else {
        Err(Error::DataSetMissing)
    }
}
