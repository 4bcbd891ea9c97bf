//! User-scoped hash drop policy.
//!
//! Each record is hashed over its data-set identity fields. Records whose
//! hash repeats earlier in the batch, or already exists for the user, are
//! dropped. Stored records are never overwritten.

use super::base::{BaseDeduplicator, validate_data};
use super::hasher::assign_data_set_data_identity_hashes;
use super::names::{DROP_HASH_NAME, DROP_HASH_VERSION};
use super::types::Deduplicator;
use crate::Result;
use crate::models::{Data, DataSet, IdentityFieldsVersion, Selectors};
use crate::observability::RequestContext;
use crate::storage::DataRepository;
use std::collections::HashSet;
use tracing::instrument;

/// Drops records whose identity hash is already known.
#[derive(Debug, Clone)]
pub struct DropHashDeduplicator {
    base: BaseDeduplicator,
}

impl DropHashDeduplicator {
    /// Creates the policy.
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: BaseDeduplicator::new(DROP_HASH_NAME, DROP_HASH_VERSION)?,
        })
    }
}

impl Deduplicator for DropHashDeduplicator {
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
        validate_data(ctx, data_set, data)?;

        for datum in data.iter_mut() {
            datum.set_user_id(Some(data_set.user_id.clone()));
            datum.set_data_set_id(Some(data_set.id.clone()));
        }
        assign_data_set_data_identity_hashes(data, IdentityFieldsVersion::DataSetId)?;

        // First occurrence wins.
        let before = data.len();
        let mut seen = HashSet::new();
        data.retain(|datum| {
            datum
                .deduplicator_hash()
                .is_none_or(|hash| seen.insert(hash.to_string()))
        });
        self.base.record_dropped("batch_duplicate", before - data.len());

        if let Some(selectors) = Selectors::from_hashes(data) {
            let existing = repository.existing_data_set_data(ctx, data_set, &selectors)?;
            let existing: HashSet<&str> = existing.hashes().collect();
            let before = data.len();
            data.retain(|datum| {
                datum
                    .deduplicator_hash()
                    .is_none_or(|hash| !existing.contains(hash))
            });
            self.base.record_dropped("existing_hash", before - data.len());
        }

        self.base.write_data(ctx, repository, data_set, data)?;
        self.base.record_operation("add_data");
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::records::BOLUS_TYPE;
    use crate::models::{Base, Basal, Bolus, Datum, Food, Glucose};
    use crate::storage::testing::RecordingRepository;
    use chrono::{TimeZone, Utc};

    fn reading(minute: u32, value: f64) -> Box<dyn Datum> {
        let mut glucose = Glucose::smbg("mg/dL", value);
        glucose.base.time = Utc.with_ymd_and_hms(2024, 5, 1, 8, minute, 0).single();
        Box::new(glucose)
    }

    fn setup() -> (RecordingRepository, DataSet) {
        let repository = RecordingRepository::new();
        let data_set = repository
            .inner
            .create_data_set(DataSet::new("ds", "user"))
            .unwrap();
        (repository, data_set)
    }

    #[test]
    fn test_stamps_and_hashes() {
        let (repository, data_set) = setup();
        let ctx = RequestContext::new();
        let mut data: Data = vec![reading(0, 100.0)];

        DropHashDeduplicator::new()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap();

        assert_eq!(data[0].user_id(), Some("user"));
        assert_eq!(data[0].data_set_id(), Some("ds"));
        assert!(data[0].deduplicator_hash().is_some());
        assert_eq!(
            repository.calls(),
            vec!["existing_data_set_data", "create_data_set_data"]
        );
    }

    #[test]
    fn test_first_occurrence_wins_within_batch() {
        let (repository, data_set) = setup();
        let ctx = RequestContext::new();
        let mut first = reading(0, 100.0);
        first.set_device_id(Some("first".to_string()));
        let mut data: Data = vec![first, reading(0, 100.0), reading(1, 100.0)];

        DropHashDeduplicator::new()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data[0].device_id(), Some("first"));
        assert_eq!(repository.inner.data_set_data("ds").len(), 2);
    }

    fn at_eight<D: Datum + 'static>(mut datum: D) -> Box<dyn Datum> {
        datum.base_mut().time = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single();
        Box::new(datum)
    }

    fn dual(normal: Option<f64>, extended: Option<f64>) -> Box<dyn Datum> {
        at_eight(Bolus {
            base: Base::new(BOLUS_TYPE),
            sub_type: "dual/square".to_string(),
            normal,
            extended,
        })
    }

    #[test]
    fn test_distinct_records_at_same_time_are_kept() {
        let (repository, data_set) = setup();
        let ctx = RequestContext::new();
        let mut data: Data = vec![
            at_eight(Food::new("apple", 10.0)),
            at_eight(Food::new("steak", 0.0)),
            at_eight(Basal::scheduled(0.5, 3_600_000)),
            at_eight(Basal::scheduled(1.5, 1_800_000)),
            dual(Some(1.0), None),
            dual(None, Some(1.0)),
        ];

        DropHashDeduplicator::new()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap();

        assert_eq!(data.len(), 6);
        assert_eq!(repository.inner.data_set_data("ds").len(), 6);
    }

    #[test]
    fn test_existing_hash_is_dropped() {
        let (repository, data_set) = setup();
        let ctx = RequestContext::new();
        let deduplicator = DropHashDeduplicator::new().unwrap();

        let mut first: Data = vec![reading(0, 100.0)];
        deduplicator
            .add_data(&ctx, &repository, &data_set, &mut first)
            .unwrap();
        let mut second: Data = vec![reading(0, 100.0), reading(5, 110.0)];
        deduplicator
            .add_data(&ctx, &repository, &data_set, &mut second)
            .unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(repository.inner.data_set_data("ds").len(), 2);
    }

    #[test]
    fn test_all_existing_skips_write() {
        let (repository, data_set) = setup();
        let ctx = RequestContext::new();
        let deduplicator = DropHashDeduplicator::new().unwrap();
        let mut data: Data = vec![reading(0, 100.0)];
        deduplicator
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap();
        repository.reset();

        let mut again: Data = vec![reading(0, 100.0)];
        deduplicator
            .add_data(&ctx, &repository, &data_set, &mut again)
            .unwrap();

        assert!(again.is_empty());
        assert_eq!(repository.calls(), vec!["existing_data_set_data"]);
    }

    #[test]
    fn test_unhashable_record_fails_before_repository() {
        let (repository, data_set) = setup();
        let ctx = RequestContext::new();
        let mut data: Data = vec![Box::new(Glucose::smbg("mg/dL", 90.0))];

        let err = DropHashDeduplicator::new()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap_err();

        assert!(matches!(err, Error::IdentityFieldsUnavailable(_)));
        assert!(repository.calls().is_empty());
    }
}
