//! Device hash deactivation policies.
//!
//! Records are hashed by device identity. Closing a data set archives the
//! same device's records in other data sets whose hashes reappear here, so
//! a re-upload of overlapping device memory leaves one active copy. Deleting
//! the data set restores what it archived.
//!
//! Two hashing schemes exist for historical reasons; each has its own policy
//! name and device allow-list.

use super::base::{BaseDeduplicator, validate, validate_data, validate_data_set};
use super::devices::{LEGACY_HASH_DEVICES, PLATFORM_HASH_DEVICES, is_device_upload, supports_model};
use super::hasher::assign_data_set_data_identity_hashes;
use super::names::{
    DEVICE_DEACTIVATE_HASH_NAME, DEVICE_DEACTIVATE_HASH_VERSION,
    DEVICE_DEACTIVATE_LEGACY_HASH_NAME, DEVICE_DEACTIVATE_LEGACY_HASH_VERSION,
};
use super::types::Deduplicator;
use crate::models::{Data, DataSet, IdentityFieldsVersion, Selectors};
use crate::observability::RequestContext;
use crate::storage::DataRepository;
use crate::{Error, Result};
use tracing::instrument;

/// Identity hashing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashVariant {
    /// User, device, millisecond time and type.
    Platform,
    /// Type, device and second-precision time.
    Legacy,
}

impl HashVariant {
    /// Identity fields hashed by this variant.
    #[must_use]
    pub const fn identity_fields_version(self) -> IdentityFieldsVersion {
        match self {
            Self::Platform => IdentityFieldsVersion::Platform,
            Self::Legacy => IdentityFieldsVersion::Legacy,
        }
    }

    /// Devices whose uploads use this variant.
    #[must_use]
    pub const fn devices(self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            Self::Platform => PLATFORM_HASH_DEVICES,
            Self::Legacy => LEGACY_HASH_DEVICES,
        }
    }
}

/// Deactivates other uploads' copies of this device's records.
#[derive(Debug, Clone)]
pub struct DeviceDeactivateHashDeduplicator {
    base: BaseDeduplicator,
}

impl DeviceDeactivateHashDeduplicator {
    /// Creates the platform hash policy.
    pub fn new() -> Result<Self> {
        Self::with_name(DEVICE_DEACTIVATE_HASH_NAME, DEVICE_DEACTIVATE_HASH_VERSION)
    }

    /// Creates the legacy hash policy.
    pub fn legacy() -> Result<Self> {
        Self::with_name(
            DEVICE_DEACTIVATE_LEGACY_HASH_NAME,
            DEVICE_DEACTIVATE_LEGACY_HASH_VERSION,
        )
    }

    /// Creates a policy under an explicit name and version.
    ///
    /// Only the platform and legacy names map to a hash variant; any other
    /// name fails with [`Error::UnknownHashType`] once hashing is needed.
    pub fn with_name(name: &str, version: &str) -> Result<Self> {
        Ok(Self {
            base: BaseDeduplicator::new(name, version)?,
        })
    }

    /// Resolves the hash variant from the policy name.
    pub fn hash_variant(&self) -> Result<HashVariant> {
        match self.base.name() {
            DEVICE_DEACTIVATE_HASH_NAME => Ok(HashVariant::Platform),
            DEVICE_DEACTIVATE_LEGACY_HASH_NAME => Ok(HashVariant::Legacy),
            other => Err(Error::UnknownHashType(other.to_string())),
        }
    }
}

impl Deduplicator for DeviceDeactivateHashDeduplicator {
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
        Ok(supports_model(
            self.hash_variant()?.devices(),
            manufacturers,
            data_set.device_model.as_deref(),
        ))
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
        let variant = self.hash_variant()?;
        assign_data_set_data_identity_hashes(data, variant.identity_fields_version())?;
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
        validate(ctx, data_set)?;
        repository.archive_device_data_using_hashes_from_data_set(ctx, data_set)?;
        self.base.close(ctx, repository, data_set)
    }

    #[instrument(skip_all, fields(deduplicator = %self.name(), data_set_id = %data_set.id, request_id = %ctx.request_id()))]
    fn delete(
        &self,
        ctx: &RequestContext,
        repository: &dyn DataRepository,
        data_set: &DataSet,
    ) -> Result<()> {
        validate(ctx, data_set)?;
        repository.unarchive_device_data_using_hashes_from_data_set(ctx, data_set)?;
        self.base.delete(ctx, repository, data_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataSetType, Datum, Glucose};
    use crate::storage::testing::RecordingRepository;
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    fn device_data_set(manufacturer: &str, model: &str) -> DataSet {
        DataSet::new("ds", "user")
            .with_device_id("device-1")
            .with_device(&[manufacturer], model)
    }

    fn reading(millis: u32) -> Box<dyn Datum> {
        let mut glucose = Glucose::smbg("mmol/L", 5.5);
        glucose.base.device_id = Some("device-1".to_string());
        glucose.base.user_id = Some("user".to_string());
        glucose.base.time = Utc
            .with_ymd_and_hms(2024, 7, 1, 9, 0, 0)
            .single()
            .map(|t| t + chrono::Duration::milliseconds(i64::from(millis)));
        Box::new(glucose)
    }

    #[test_case(HashVariant::Platform, PLATFORM_HASH_DEVICES ; "platform devices")]
    #[test_case(HashVariant::Legacy, LEGACY_HASH_DEVICES ; "legacy devices")]
    fn test_every_listed_device_is_claimed_by_its_variant_only(
        variant: HashVariant,
        devices: &[(&str, &[&str])],
    ) {
        let platform = DeviceDeactivateHashDeduplicator::new().unwrap();
        let legacy = DeviceDeactivateHashDeduplicator::legacy().unwrap();
        let (matching, other) = match variant {
            HashVariant::Platform => (&platform, &legacy),
            HashVariant::Legacy => (&legacy, &platform),
        };
        assert_eq!(variant.devices(), devices);

        let mut checked = 0;
        for (manufacturer, models) in devices {
            for model in *models {
                let data_set = device_data_set(manufacturer, model);
                assert!(
                    matching.claims(&data_set).unwrap(),
                    "{manufacturer} {model} not claimed by {}",
                    matching.name()
                );
                assert!(
                    !other.claims(&data_set).unwrap(),
                    "{manufacturer} {model} also claimed by {}",
                    other.name()
                );
                checked += 1;
            }
        }
        assert_eq!(checked, devices.iter().map(|(_, models)| models.len()).sum::<usize>());
    }

    #[test]
    fn test_claims_requires_normal_device_upload() {
        let platform = DeviceDeactivateHashDeduplicator::new().unwrap();

        let continuous = device_data_set("Abbott", "FreeStyle Libre").with_type(DataSetType::Continuous);
        assert!(!platform.claims(&continuous).unwrap());

        let mut no_device = device_data_set("Abbott", "FreeStyle Libre");
        no_device.device_id = None;
        assert!(!platform.claims(&no_device).unwrap());

        assert!(!platform.claims(&device_data_set("Abbott", "Unknown")).unwrap());
    }

    #[test]
    fn test_claims_defers_to_recorded_name() {
        let platform = DeviceDeactivateHashDeduplicator::new().unwrap();

        let other = device_data_set("Abbott", "FreeStyle Libre").with_deduplicator_name("org.other.name");
        assert!(!platform.claims(&other).unwrap());

        let alias = device_data_set("Unknown", "Unknown")
            .with_deduplicator_name("org.tidemark.hash-deactivate-old");
        assert!(platform.claims(&alias).unwrap());
        assert!(platform.owns(&alias).unwrap());
    }

    #[test]
    fn test_hash_variant() {
        assert_eq!(
            DeviceDeactivateHashDeduplicator::new().unwrap().hash_variant().unwrap(),
            HashVariant::Platform
        );
        assert_eq!(
            DeviceDeactivateHashDeduplicator::legacy().unwrap().hash_variant().unwrap(),
            HashVariant::Legacy
        );
        let custom = DeviceDeactivateHashDeduplicator::with_name("org.example.custom", "1.0.0").unwrap();
        assert!(matches!(custom.hash_variant(), Err(Error::UnknownHashType(ref n)) if n == "org.example.custom"));
    }

    #[test]
    fn test_unknown_variant_fails_add_data_before_repository() {
        let repository = RecordingRepository::new();
        let data_set = repository
            .inner
            .create_data_set(device_data_set("Abbott", "FreeStyle Libre"))
            .unwrap();
        let ctx = RequestContext::new();
        let custom = DeviceDeactivateHashDeduplicator::with_name("org.example.custom", "1.0.0").unwrap();
        let mut data: Data = vec![reading(0)];

        let err = custom
            .add_data(&ctx, &repository, &data_set, &mut data)
            .unwrap_err();

        assert!(matches!(err, Error::UnknownHashType(_)));
        assert!(repository.calls().is_empty());
    }

    #[test]
    fn test_legacy_hash_ignores_milliseconds() {
        let repository = RecordingRepository::new();
        let data_set = repository
            .inner
            .create_data_set(device_data_set("Bayer", "Contour"))
            .unwrap();
        let ctx = RequestContext::new();

        let mut platform_data: Data = vec![reading(0), reading(250)];
        DeviceDeactivateHashDeduplicator::new()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut platform_data)
            .unwrap();
        assert_ne!(platform_data[0].deduplicator_hash(), platform_data[1].deduplicator_hash());

        let mut legacy_data: Data = vec![reading(0), reading(250)];
        DeviceDeactivateHashDeduplicator::legacy()
            .unwrap()
            .add_data(&ctx, &repository, &data_set, &mut legacy_data)
            .unwrap();
        assert_eq!(legacy_data[0].deduplicator_hash(), legacy_data[1].deduplicator_hash());
    }

    #[test]
    fn test_close_archives_then_closes() {
        let repository = RecordingRepository::new();
        let data_set = repository
            .inner
            .create_data_set(device_data_set("Abbott", "FreeStyle Libre"))
            .unwrap();
        let ctx = RequestContext::new();

        DeviceDeactivateHashDeduplicator::new()
            .unwrap()
            .close(&ctx, &repository, &data_set)
            .unwrap();

        assert_eq!(
            repository.calls(),
            vec![
                "archive_device_data_using_hashes_from_data_set",
                "update_data_set",
                "activate_data_set_data"
            ]
        );
    }

    #[test]
    fn test_close_stops_when_archive_fails() {
        let repository =
            RecordingRepository::new().fail_on("archive_device_data_using_hashes_from_data_set");
        let data_set = repository
            .inner
            .create_data_set(device_data_set("Abbott", "FreeStyle Libre"))
            .unwrap();
        let ctx = RequestContext::new();

        assert!(DeviceDeactivateHashDeduplicator::new()
            .unwrap()
            .close(&ctx, &repository, &data_set)
            .is_err());
        assert_eq!(
            repository.calls(),
            vec!["archive_device_data_using_hashes_from_data_set"]
        );
    }

    #[test]
    fn test_delete_unarchives_then_deletes() {
        let repository = RecordingRepository::new();
        let data_set = repository
            .inner
            .create_data_set(device_data_set("Abbott", "FreeStyle Libre"))
            .unwrap();
        let ctx = RequestContext::new();

        DeviceDeactivateHashDeduplicator::new()
            .unwrap()
            .delete(&ctx, &repository, &data_set)
            .unwrap();

        assert_eq!(
            repository.calls(),
            vec![
                "unarchive_device_data_using_hashes_from_data_set",
                "delete_data_set"
            ]
        );
    }
}
