//! Device record capability interface.
//!
//! The engine never inspects concrete record types. Every record embeds a
//! [`Base`] carrying the fields the engine reads and writes, and implements
//! [`Datum`] to expose it together with its type-specific identity fields.

use super::DeduplicatorDescriptor;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time layout used in platform and data-set identity fields.
pub const IDENTITY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Time layout used in legacy identity fields.
pub const LEGACY_IDENTITY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Selects which rule set a record uses to describe its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityFieldsVersion {
    /// User, data set, time and type. Identity never spans uploads.
    DataSetId,
    /// User, device, time and type.
    Platform,
    /// Type, device and second-precision time, as hashed by older uploaders.
    Legacy,
}

impl IdentityFieldsVersion {
    /// Returns the version tag as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DataSetId => "dataSetId",
            Self::Platform => "platform",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for IdentityFieldsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Device-reported identity of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Id assigned by the source device or app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the source app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Time the source last modified the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl Origin {
    /// Creates an origin with an id and time.
    #[must_use]
    pub fn new(id: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
            time: Some(time),
        }
    }

    /// Returns the origin id if present and non-empty.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Fields shared by every record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    /// Server-assigned record id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Record type, e.g. `cbg` or `bolus`.
    #[serde(rename = "type")]
    pub datum_type: String,
    /// Owning user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Data set (upload) id.
    #[serde(default, rename = "uploadId", skip_serializing_if = "Option::is_none")]
    pub data_set_id: Option<String>,
    /// Device id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Event time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Device-reported identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    /// Identity hash assigned by a deduplicator.
    #[serde(default, rename = "_deduplicator", skip_serializing_if = "Option::is_none")]
    pub deduplicator: Option<DeduplicatorDescriptor>,
    /// Whether the record is visible downstream.
    #[serde(default, rename = "_active")]
    pub active: bool,
}

impl Base {
    /// Creates a base for a record type.
    #[must_use]
    pub fn new(datum_type: impl Into<String>) -> Self {
        Self {
            datum_type: datum_type.into(),
            ..Self::default()
        }
    }

    /// Returns the common identity fields for a version.
    pub fn identity_fields(&self, version: IdentityFieldsVersion) -> Result<Vec<String>> {
        match version {
            IdentityFieldsVersion::DataSetId => Ok(vec![
                required(self.user_id.as_deref(), "user id")?,
                required(self.data_set_id.as_deref(), "data set id")?,
                self.time_field(IDENTITY_TIME_FORMAT)?,
                self.type_field()?,
            ]),
            IdentityFieldsVersion::Platform => Ok(vec![
                required(self.user_id.as_deref(), "user id")?,
                required(self.device_id.as_deref(), "device id")?,
                self.time_field(IDENTITY_TIME_FORMAT)?,
                self.type_field()?,
            ]),
            IdentityFieldsVersion::Legacy => Ok(vec![
                self.type_field()?,
                required(self.device_id.as_deref(), "device id")?,
                self.time_field(LEGACY_IDENTITY_TIME_FORMAT)?,
            ]),
        }
    }

    fn time_field(&self, format: &str) -> Result<String> {
        self.time
            .map(|time| time.format(format).to_string())
            .ok_or_else(|| Error::InvalidDatum("time is missing".to_string()))
    }

    fn type_field(&self) -> Result<String> {
        required(Some(self.datum_type.as_str()), "type")
    }
}

/// Returns the value or an `InvalidDatum` error naming the missing field.
pub(crate) fn required(value: Option<&str>, field: &str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(Error::InvalidDatum(format!("{field} is missing"))),
    }
}

/// Formats a float for identity fields using its shortest exact representation.
pub(crate) fn format_float(value: f64) -> String {
    format!("{value}")
}

/// Capability interface the engine uses to read and stamp records.
pub trait Datum: fmt::Debug + Send + Sync {
    /// Returns the shared fields.
    fn base(&self) -> &Base;

    /// Returns the shared fields mutably.
    fn base_mut(&mut self) -> &mut Base;

    /// Returns identity fields specific to the record type.
    ///
    /// Appended after the common fields. Defaults to none.
    fn type_identity_fields(&self, _version: IdentityFieldsVersion) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Returns the ordered identity fields for a version.
    fn identity_fields(&self, version: IdentityFieldsVersion) -> Result<Vec<String>> {
        let mut fields = self.base().identity_fields(version)?;
        fields.extend(self.type_identity_fields(version)?);
        Ok(fields)
    }

    /// Returns the record type.
    fn datum_type(&self) -> &str {
        &self.base().datum_type
    }

    /// Returns the owning user id.
    fn user_id(&self) -> Option<&str> {
        self.base().user_id.as_deref()
    }

    /// Sets the owning user id.
    fn set_user_id(&mut self, user_id: Option<String>) {
        self.base_mut().user_id = user_id;
    }

    /// Returns the data set id.
    fn data_set_id(&self) -> Option<&str> {
        self.base().data_set_id.as_deref()
    }

    /// Sets the data set id.
    fn set_data_set_id(&mut self, data_set_id: Option<String>) {
        self.base_mut().data_set_id = data_set_id;
    }

    /// Returns the device id.
    fn device_id(&self) -> Option<&str> {
        self.base().device_id.as_deref()
    }

    /// Sets the device id.
    fn set_device_id(&mut self, device_id: Option<String>) {
        self.base_mut().device_id = device_id;
    }

    /// Returns the active flag.
    fn active(&self) -> bool {
        self.base().active
    }

    /// Sets the active flag.
    fn set_active(&mut self, active: bool) {
        self.base_mut().active = active;
    }

    /// Returns the origin.
    fn origin(&self) -> Option<&Origin> {
        self.base().origin.as_ref()
    }

    /// Sets the origin.
    fn set_origin(&mut self, origin: Option<Origin>) {
        self.base_mut().origin = origin;
    }

    /// Returns the deduplicator descriptor.
    fn deduplicator_descriptor(&self) -> Option<&DeduplicatorDescriptor> {
        self.base().deduplicator.as_ref()
    }

    /// Sets the deduplicator descriptor.
    fn set_deduplicator_descriptor(&mut self, descriptor: Option<DeduplicatorDescriptor>) {
        self.base_mut().deduplicator = descriptor;
    }

    /// Returns the identity hash, if assigned.
    fn deduplicator_hash(&self) -> Option<&str> {
        self.deduplicator_descriptor()
            .and_then(|d| d.hash.as_deref())
            .filter(|hash| !hash.is_empty())
    }
}

/// A batch of records.
pub type Data = Vec<Box<dyn Datum>>;
