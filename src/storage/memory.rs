//! In-memory data repository.
//!
//! Provides a non-persistent implementation of [`DataRepository`] for tests
//! and local development. Records are kept as snapshots of their shared
//! fields ([`Base`]); type-specific payload is not retained.

use crate::models::{Base, DataSet, DataSetUpdate, Datum, Selector, Selectors};
use crate::observability::RequestContext;
use crate::storage::traits::DataRepository;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// A stored record and its storage state.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDatum {
    /// Shared record fields.
    pub base: Base,
    /// Soft-deleted.
    pub deleted: bool,
    /// Archived (inactive but retained).
    pub archived: bool,
    /// Data set on whose behalf the record was archived by hash.
    pub archived_data_set_id: Option<String>,
    /// Time the record was stored.
    pub created_time: DateTime<Utc>,
}

impl Datum for StoredDatum {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
}

impl StoredDatum {
    fn in_data_set(&self, data_set: &DataSet) -> bool {
        self.base.data_set_id.as_deref() == Some(data_set.id.as_str())
    }

    fn in_other_data_set_of_device(&self, data_set: &DataSet) -> bool {
        let Some(device_id) = data_set.device_id.as_deref() else {
            return false;
        };
        !self.in_data_set(data_set)
            && self.base.user_id.as_deref() == Some(data_set.user_id.as_str())
            && self.base.device_id.as_deref() == Some(device_id)
    }

    fn archive_for(&mut self, data_set_id: Option<&str>) {
        self.base.active = false;
        self.archived = true;
        self.archived_data_set_id = data_set_id.map(ToString::to_string);
    }

    fn soft_delete(&mut self) {
        self.base.active = false;
        self.deleted = true;
    }
}

/// In-memory data repository.
///
/// Uses `RwLock` for thread-safe access. Data is not persisted between runs.
///
/// # Example
///
/// ```rust
/// use tidemark::{DataSet, InMemoryDataRepository};
///
/// let repository = InMemoryDataRepository::new();
/// repository.create_data_set(DataSet::new("upload-1", "user-1")).unwrap();
/// assert!(repository.data_set("upload-1").is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDataRepository {
    data_sets: RwLock<HashMap<String, DataSet>>,
    data: RwLock<Vec<StoredDatum>>,
}

impl InMemoryDataRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new data set, as the ingestion layer does before deduplication.
    ///
    /// # Errors
    ///
    /// Returns an error if the data set is unidentified or already exists.
    pub fn create_data_set(&self, mut data_set: DataSet) -> Result<DataSet> {
        if !data_set.is_identified() {
            return Err(Error::DataSetMissing);
        }
        let mut data_sets = self.write_data_sets("create_data_set")?;
        if data_sets.contains_key(&data_set.id) {
            return Err(repository_error(
                "create_data_set",
                format!("data set {} already exists", data_set.id),
            ));
        }
        data_set.created_time.get_or_insert_with(Utc::now);
        data_sets.insert(data_set.id.clone(), data_set.clone());
        Ok(data_set)
    }

    /// Returns a stored data set.
    #[must_use]
    pub fn data_set(&self, id: &str) -> Option<DataSet> {
        self.data_sets.read().ok()?.get(id).cloned()
    }

    /// Returns every stored record of a data set, including deleted and archived ones.
    #[must_use]
    pub fn data_set_data(&self, data_set_id: &str) -> Vec<StoredDatum> {
        self.data
            .read()
            .map(|data| {
                data.iter()
                    .filter(|d| d.base.data_set_id.as_deref() == Some(data_set_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the active records of a user.
    #[must_use]
    pub fn active_user_data(&self, user_id: &str) -> Vec<StoredDatum> {
        self.data
            .read()
            .map(|data| {
                data.iter()
                    .filter(|d| d.base.active && d.base.user_id.as_deref() == Some(user_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn data_count(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    fn read_data(&self, operation: &str) -> Result<RwLockReadGuard<'_, Vec<StoredDatum>>> {
        self.data
            .read()
            .map_err(|e| repository_error(operation, e.to_string()))
    }

    fn write_data(&self, operation: &str) -> Result<RwLockWriteGuard<'_, Vec<StoredDatum>>> {
        self.data
            .write()
            .map_err(|e| repository_error(operation, e.to_string()))
    }

    fn write_data_sets(
        &self,
        operation: &str,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, DataSet>>> {
        self.data_sets
            .write()
            .map_err(|e| repository_error(operation, e.to_string()))
    }

    fn require_data_set(&self, operation: &str, data_set: &DataSet) -> Result<()> {
        let data_sets = self
            .data_sets
            .read()
            .map_err(|e| repository_error(operation, e.to_string()))?;
        if data_sets.contains_key(&data_set.id) {
            Ok(())
        } else {
            Err(not_found(operation, &data_set.id))
        }
    }

    /// Applies `f` to every record of the data set matched by `selectors`.
    fn update_matching<F>(
        &self,
        operation: &str,
        data_set: &DataSet,
        selectors: Option<&Selectors>,
        mut f: F,
    ) -> Result<usize>
    where
        F: FnMut(&mut StoredDatum),
    {
        let mut data = self.write_data(operation)?;
        let mut count = 0;
        for datum in data.iter_mut().filter(|d| {
            d.in_data_set(data_set) && selectors.is_none_or(|s| s.matches(&**d))
        }) {
            f(datum);
            count += 1;
        }
        tracing::debug!(operation, data_set_id = %data_set.id, count, "Updated records");
        Ok(count)
    }

    fn remove_matching<F>(&self, operation: &str, data_set: &DataSet, keep: F) -> Result<usize>
    where
        F: Fn(&StoredDatum) -> bool,
    {
        let mut data = self.write_data(operation)?;
        let before = data.len();
        data.retain(|d| !d.in_data_set(data_set) || keep(d));
        let removed = before - data.len();
        tracing::debug!(operation, data_set_id = %data_set.id, removed, "Removed records");
        Ok(removed)
    }
}

impl DataRepository for InMemoryDataRepository {
    fn update_data_set(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: &DataSetUpdate,
    ) -> Result<DataSet> {
        ctx.check()?;
        let mut data_sets = self.write_data_sets("update_data_set")?;
        let data_set = data_sets
            .get_mut(id)
            .ok_or_else(|| not_found("update_data_set", id))?;
        data_set.apply(update);
        Ok(data_set.clone())
    }

    fn create_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        data: &[Box<dyn Datum>],
    ) -> Result<()> {
        ctx.check()?;
        self.require_data_set("create_data_set_data", data_set)?;
        let now = Utc::now();
        let mut stored = self.write_data("create_data_set_data")?;
        for datum in data {
            let mut base = datum.base().clone();
            base.id.get_or_insert_with(|| Uuid::now_v7().to_string());
            base.data_set_id.get_or_insert_with(|| data_set.id.clone());
            base.user_id.get_or_insert_with(|| data_set.user_id.clone());
            stored.push(StoredDatum {
                base,
                deleted: false,
                archived: false,
                archived_data_set_id: None,
                created_time: now,
            });
        }
        tracing::debug!(data_set_id = %data_set.id, count = data.len(), "Created records");
        Ok(())
    }

    fn delete_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        ctx.check()?;
        self.update_matching("delete_data_set_data", data_set, Some(selectors), |d| {
            if !d.deleted {
                d.soft_delete();
            }
        })?;
        Ok(())
    }

    fn destroy_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        ctx.check()?;
        self.remove_matching("destroy_data_set_data", data_set, |d| {
            !selectors.matches(d as &dyn Datum)
        })?;
        Ok(())
    }

    fn destroy_deleted_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        ctx.check()?;
        self.remove_matching("destroy_deleted_data_set_data", data_set, |d| {
            !(d.deleted && selectors.matches(d as &dyn Datum))
        })?;
        Ok(())
    }

    fn archive_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<()> {
        ctx.check()?;
        self.update_matching("archive_data_set_data", data_set, Some(selectors), |d| {
            if !d.deleted {
                d.archive_for(None);
            }
        })?;
        Ok(())
    }

    fn activate_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: Option<&Selectors>,
    ) -> Result<()> {
        ctx.check()?;
        self.update_matching("activate_data_set_data", data_set, selectors, |d| {
            if !d.deleted && !d.archived {
                d.base.active = true;
            }
        })?;
        Ok(())
    }

    fn existing_data_set_data(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
        selectors: &Selectors,
    ) -> Result<Selectors> {
        ctx.check()?;
        let data = self.read_data("existing_data_set_data")?;
        let mut seen = HashSet::new();
        let mut existing = Selectors::default();

        for datum in data.iter().filter(|d| !d.deleted) {
            let same_user = datum.base.user_id.as_deref() == Some(data_set.user_id.as_str());
            for selector in selectors {
                let in_scope = match selector {
                    Selector::Deduplicator { .. } => same_user,
                    Selector::Id { .. } | Selector::Origin(_) => datum.in_data_set(data_set),
                };
                if !in_scope || !selector.matches(datum) {
                    continue;
                }
                let found = match selector {
                    Selector::Id { id, .. } => Selector::id(id.clone(), datum.base.time),
                    Selector::Deduplicator { hash } => Selector::hash(hash.clone()),
                    Selector::Origin(origin) => Selector::origin(
                        origin.id.clone(),
                        datum.base.origin.as_ref().and_then(|o| o.time),
                    ),
                };
                if seen.insert(found.clone()) {
                    existing.push(found);
                }
            }
        }

        Ok(existing)
    }

    fn delete_data_set(&self, ctx: &RequestContext, data_set: &DataSet) -> Result<()> {
        ctx.check()?;
        let removed = self
            .write_data_sets("delete_data_set")?
            .remove(&data_set.id)
            .is_some();
        if !removed {
            return Err(not_found("delete_data_set", &data_set.id));
        }
        self.remove_matching("delete_data_set", data_set, |_| false)?;
        Ok(())
    }

    fn delete_other_data_set_data(&self, ctx: &RequestContext, data_set: &DataSet) -> Result<()> {
        ctx.check()?;
        let mut data = self.write_data("delete_other_data_set_data")?;
        let mut count = 0;
        for datum in data
            .iter_mut()
            .filter(|d| !d.deleted && d.in_other_data_set_of_device(data_set))
        {
            datum.soft_delete();
            count += 1;
        }
        tracing::debug!(data_set_id = %data_set.id, count, "Deleted other data set records");
        Ok(())
    }

    fn archive_device_data_using_hashes_from_data_set(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
    ) -> Result<()> {
        ctx.check()?;
        let mut data = self.write_data("archive_device_data_using_hashes_from_data_set")?;
        let hashes: HashSet<String> = data
            .iter()
            .filter(|d| d.in_data_set(data_set) && !d.deleted)
            .filter_map(|d| d.deduplicator_hash().map(ToString::to_string))
            .collect();
        let mut count = 0;
        for datum in data.iter_mut().filter(|d| {
            d.base.active
                && d.in_other_data_set_of_device(data_set)
                && d.deduplicator_hash().is_some_and(|h| hashes.contains(h))
        }) {
            datum.archive_for(Some(data_set.id.as_str()));
            count += 1;
        }
        tracing::debug!(data_set_id = %data_set.id, count, "Archived device records by hash");
        Ok(())
    }

    fn unarchive_device_data_using_hashes_from_data_set(
        &self,
        ctx: &RequestContext,
        data_set: &DataSet,
    ) -> Result<()> {
        ctx.check()?;
        let mut data = self.write_data("unarchive_device_data_using_hashes_from_data_set")?;
        let mut count = 0;
        for datum in data
            .iter_mut()
            .filter(|d| d.archived_data_set_id.as_deref() == Some(data_set.id.as_str()))
        {
            datum.base.active = !datum.deleted;
            datum.archived = false;
            datum.archived_data_set_id = None;
            count += 1;
        }
        tracing::debug!(data_set_id = %data_set.id, count, "Unarchived device records");
        Ok(())
    }
}

fn repository_error(operation: &str, cause: impl Into<String>) -> Error {
    Error::Repository {
        operation: operation.to_string(),
        cause: cause.into(),
    }
}

fn not_found(operation: &str, id: &str) -> Error {
    repository_error(operation, format!("data set {id} not found"))
}
