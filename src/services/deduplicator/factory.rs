//! Deduplicator registry.
//!
//! The factory is an ordered list of policies owned by the caller. Order is
//! significant: the first policy that claims a data set wins, so specific
//! policies are registered before general ones.

use super::config::DeduplicatorConfig;
use super::delete_origin::DeleteOriginDeduplicator;
use super::delete_origin_older::DeleteOriginOlderDeduplicator;
use super::device_deactivate_hash::DeviceDeactivateHashDeduplicator;
use super::device_truncate::DeviceTruncateDataSetDeduplicator;
use super::drop_hash::DropHashDeduplicator;
use super::none::NoneDeduplicator;
use super::types::Deduplicator;
use crate::models::DataSet;
use crate::{Error, Result};

/// Ordered deduplicator registry.
///
/// # Default order
///
/// | # | Policy |
/// |---|--------|
/// | 1 | delete-origin-older |
/// | 2 | delete-origin |
/// | 3 | device deactivate hash (platform) |
/// | 4 | device deactivate hash (legacy) |
/// | 5 | device truncate data set |
/// | 6 | drop hash (if enabled) |
/// | 7 | none |
///
/// # Example
///
/// ```rust
/// use tidemark::{DataSet, DeduplicatorFactory};
///
/// let factory = DeduplicatorFactory::new();
/// let data_set = DataSet::new("upload-1", "user-1")
///     .with_device_id("device-1")
///     .with_device(&["Abbott"], "FreeStyle Libre");
///
/// let deduplicator = factory.require_new(&data_set).unwrap();
/// assert_eq!(deduplicator.name(), "org.tidemark.deduplicator.device.deactivate.hash");
/// ```
#[derive(Debug)]
pub struct DeduplicatorFactory {
    deduplicators: Vec<Box<dyn Deduplicator>>,
}

impl DeduplicatorFactory {
    /// Creates the default registry.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&DeduplicatorConfig::default())
    }

    /// Creates an empty registry.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            deduplicators: Vec::new(),
        }
    }

    /// Creates the default registry for a configuration.
    #[must_use]
    pub fn from_config(config: &DeduplicatorConfig) -> Self {
        let mut factory = Self::empty();
        for result in default_deduplicators(config) {
            if let Err(e) = result.and_then(|deduplicator| factory.register(deduplicator)) {
                tracing::error!(error = %e, "Skipping deduplicator");
            }
        }
        tracing::debug!(
            deduplicators = ?factory.names(),
            "Built deduplicator registry"
        );
        factory
    }

    /// Appends a policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeduplicator`] if a policy with the same name
    /// is already registered.
    pub fn register(&mut self, deduplicator: Box<dyn Deduplicator>) -> Result<()> {
        if self.deduplicators.iter().any(|d| d.name() == deduplicator.name()) {
            return Err(Error::InvalidDeduplicator(format!(
                "{} is already registered",
                deduplicator.name()
            )));
        }
        self.deduplicators.push(deduplicator);
        Ok(())
    }

    /// Builder form of [`Self::register`].
    pub fn with(mut self, deduplicator: Box<dyn Deduplicator>) -> Result<Self> {
        self.register(deduplicator)?;
        Ok(self)
    }

    /// Returns the registered names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.deduplicators.iter().map(|d| d.name()).collect()
    }

    /// Returns the number of registered policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deduplicators.len()
    }

    /// Returns true if no policy is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deduplicators.is_empty()
    }

    /// Returns the first policy that claims a new data set.
    pub fn new_deduplicator(&self, data_set: &DataSet) -> Result<Option<&dyn Deduplicator>> {
        for deduplicator in &self.deduplicators {
            if deduplicator.claims(data_set)? {
                tracing::debug!(
                    data_set_id = %data_set.id,
                    deduplicator = %deduplicator.name(),
                    "Deduplicator claimed data set"
                );
                return Ok(Some(deduplicator.as_ref()));
            }
        }
        Ok(None)
    }

    /// Returns the policy that owns an existing data set.
    pub fn get_deduplicator(&self, data_set: &DataSet) -> Result<Option<&dyn Deduplicator>> {
        for deduplicator in &self.deduplicators {
            if deduplicator.owns(data_set)? {
                return Ok(Some(deduplicator.as_ref()));
            }
        }
        Ok(None)
    }

    /// Like [`Self::new_deduplicator`], failing when no policy claims the data set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeduplicatorNotFound`] if no policy claims it.
    pub fn require_new(&self, data_set: &DataSet) -> Result<&dyn Deduplicator> {
        self.new_deduplicator(data_set)?
            .ok_or_else(|| not_found(data_set))
    }

    /// Like [`Self::get_deduplicator`], failing when no policy owns the data set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeduplicatorNotFound`] if no policy owns it.
    pub fn require_get(&self, data_set: &DataSet) -> Result<&dyn Deduplicator> {
        self.get_deduplicator(data_set)?
            .ok_or_else(|| not_found(data_set))
    }
}

impl Default for DeduplicatorFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn default_deduplicators(config: &DeduplicatorConfig) -> Vec<Result<Box<dyn Deduplicator>>> {
    let mut deduplicators: Vec<Result<Box<dyn Deduplicator>>> = vec![
        DeleteOriginOlderDeduplicator::with_types(config.delete_origin_older_types.clone())
            .map(|d| Box::new(d) as Box<dyn Deduplicator>),
        DeleteOriginDeduplicator::new().map(|d| Box::new(d) as Box<dyn Deduplicator>),
        DeviceDeactivateHashDeduplicator::new().map(|d| Box::new(d) as Box<dyn Deduplicator>),
        DeviceDeactivateHashDeduplicator::legacy().map(|d| Box::new(d) as Box<dyn Deduplicator>),
        DeviceTruncateDataSetDeduplicator::new().map(|d| Box::new(d) as Box<dyn Deduplicator>),
    ];
    if config.drop_hash_enabled {
        deduplicators.push(DropHashDeduplicator::new().map(|d| Box::new(d) as Box<dyn Deduplicator>));
    }
    deduplicators.push(NoneDeduplicator::new().map(|d| Box::new(d) as Box<dyn Deduplicator>));
    deduplicators
}

fn not_found(data_set: &DataSet) -> Error {
    Error::DeduplicatorNotFound {
        data_set_id: data_set.id.clone(),
    }
}
