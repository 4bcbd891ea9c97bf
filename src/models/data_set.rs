//! Data set (upload) types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of upload a data set represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSetType {
    /// A bounded upload that stays inactive until it is closed.
    Normal,
    /// An open-ended stream whose data is visible immediately.
    Continuous,
}

impl DataSetType {
    /// Returns the type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Continuous => "continuous",
        }
    }

    /// Parses a data set type from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "continuous" => Some(Self::Continuous),
            _ => None,
        }
    }
}

impl fmt::Display for DataSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Records which deduplicator owns a data set, or a record's identity hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeduplicatorDescriptor {
    /// Reverse-domain name of the owning policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Semantic version of the owning policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Identity hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl DeduplicatorDescriptor {
    /// Creates a descriptor naming a policy.
    #[must_use]
    pub fn named(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: Some(version.into()),
            hash: None,
        }
    }

    /// Creates a descriptor carrying only a hash.
    #[must_use]
    pub fn hashed(hash: impl Into<String>) -> Self {
        Self {
            hash: Some(hash.into()),
            ..Self::default()
        }
    }

    /// Returns true if a non-empty name is recorded.
    #[must_use]
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.is_empty())
    }
}

/// One device-sync ingestion unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    /// Upload id.
    pub id: String,
    /// Owning user id.
    pub user_id: String,
    /// Upload kind; `None` is treated as normal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_type: Option<DataSetType>,
    /// Device id declared by the uploader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Device manufacturers in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_manufacturers: Option<Vec<String>>,
    /// Device model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    /// Whether the data set is visible downstream.
    #[serde(default)]
    pub active: bool,
    /// Owning deduplicator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplicator: Option<DeduplicatorDescriptor>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
}

impl DataSet {
    /// Creates a data set with the given id and owner.
    #[must_use]
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Sets the data set type.
    #[must_use]
    pub const fn with_type(mut self, data_set_type: DataSetType) -> Self {
        self.data_set_type = Some(data_set_type);
        self
    }

    /// Sets the device id.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Sets the device manufacturers and model.
    #[must_use]
    pub fn with_device(mut self, manufacturers: &[&str], model: impl Into<String>) -> Self {
        self.device_manufacturers = Some(manufacturers.iter().map(|m| (*m).to_string()).collect());
        self.device_model = Some(model.into());
        self
    }

    /// Sets the owning deduplicator name, as a client requesting a policy would.
    #[must_use]
    pub fn with_deduplicator_name(mut self, name: impl Into<String>) -> Self {
        self.deduplicator = Some(DeduplicatorDescriptor {
            name: Some(name.into()),
            ..DeduplicatorDescriptor::default()
        });
        self
    }

    /// True for normal and unspecified data sets.
    #[must_use]
    pub fn has_data_set_type_normal(&self) -> bool {
        matches!(self.data_set_type, None | Some(DataSetType::Normal))
    }

    /// True for continuous data sets.
    #[must_use]
    pub fn has_data_set_type_continuous(&self) -> bool {
        self.data_set_type == Some(DataSetType::Continuous)
    }

    /// True if a deduplicator name is recorded.
    #[must_use]
    pub fn has_deduplicator_name(&self) -> bool {
        self.deduplicator
            .as_ref()
            .is_some_and(DeduplicatorDescriptor::has_name)
    }

    /// Returns the recorded deduplicator name.
    #[must_use]
    pub fn deduplicator_name(&self) -> Option<&str> {
        self.deduplicator
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Returns true if the data set was created by the ingestion layer.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        !self.id.is_empty() && !self.user_id.is_empty()
    }

    /// Applies an update in place.
    pub fn apply(&mut self, update: &DataSetUpdate) {
        if let Some(active) = update.active {
            self.active = active;
        }
        if let Some(ref deduplicator) = update.deduplicator {
            self.deduplicator = Some(deduplicator.clone());
        }
        self.modified_time = Some(Utc::now());
    }
}

/// Partial update applied to a stored data set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetUpdate {
    /// New active flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// New deduplicator descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplicator: Option<DeduplicatorDescriptor>,
}

impl DataSetUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the active flag.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Sets the deduplicator descriptor.
    #[must_use]
    pub fn with_deduplicator(mut self, deduplicator: DeduplicatorDescriptor) -> Self {
        self.deduplicator = Some(deduplicator);
        self
    }

    /// True if the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.active.is_none() && self.deduplicator.is_none()
    }
}
