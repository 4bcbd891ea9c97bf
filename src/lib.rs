//! # Tidemark
//!
//! Deduplication engine for time-series medical device data.
//!
//! Device uploads arrive as *data sets* (glucose readings, boluses, basal
//! rates, food entries). Each data set is owned by exactly one deduplicator
//! policy, which decides how newly uploaded records are reconciled against
//! previously stored records for the same user and device.
//!
//! ## Features
//!
//! - Content-addressed record identity (SHA-256 over ordered identity fields)
//! - Interchangeable policies: none, drop-hash, delete-origin, delete-origin-older,
//!   device deactivate-hash (platform and legacy), device truncate
//! - Ordered policy registry with deprecated-name aliasing
//! - Storage-agnostic: policies talk to a [`DataRepository`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use tidemark::{DeduplicatorFactory, InMemoryDataRepository, RequestContext};
//!
//! let factory = DeduplicatorFactory::new();
//! let repository = InMemoryDataRepository::new();
//! let ctx = RequestContext::new();
//!
//! let deduplicator = factory.require_new(&data_set)?;
//! let data_set = deduplicator.open(&ctx, &repository, &data_set)?;
//! deduplicator.add_data(&ctx, &repository, &data_set, &mut data)?;
//! deduplicator.close(&ctx, &repository, &data_set)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::TidemarkConfig;
pub use models::{
    Data, DataSet, DataSetType, DataSetUpdate, Datum, DeduplicatorDescriptor,
    IdentityFieldsVersion, Origin, Selector, SelectorOrigin, Selectors,
};
pub use observability::RequestContext;
pub use services::deduplicator::{
    Deduplicator, DeduplicatorConfig, DeduplicatorFactory, generate_identity_hash,
};
pub use storage::{DataRepository, InMemoryDataRepository};

/// Error type for tidemark operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `ContextCancelled` / `ContextDeadlineExceeded` | The request context is done before or during an operation |
/// | `DataSetMissing` | The data set has no id or no owning user |
/// | `DataMissing` | `add_data` is called with an empty batch |
/// | `SelectorsMissing` | `delete_data` is called with an empty selector set |
/// | `DataSetUsesDifferentDeduplicator` | `open` on a data set owned by another policy |
/// | `IdentityFieldsMissing` / `IdentityFieldEmpty` | Hashing an empty field list or an empty field |
/// | `IdentityFieldsUnavailable` / `IdentityHashUnavailable` | Assigning identity hashes to a batch fails |
/// | `InvalidDatum` | A record lacks a field required for its identity |
/// | `InvalidDeduplicator` / `UnknownHashType` | A policy is constructed or registered with a bad name or version |
/// | `DeduplicatorNotFound` | No registered policy claims or owns a data set |
/// | `Repository` | The backing store fails; passed through unchanged |
/// | `OperationFailed` | Ambient failures such as config file I/O or logging init |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The request context was cancelled.
    #[error("context {request_id} is cancelled")]
    ContextCancelled {
        /// Request id of the cancelled context.
        request_id: String,
    },

    /// The request context deadline has passed.
    #[error("context {request_id} deadline exceeded")]
    ContextDeadlineExceeded {
        /// Request id of the expired context.
        request_id: String,
    },

    /// The data set is missing.
    ///
    /// Raised when the data set has an empty id or an empty user id, which
    /// means it was never created by the ingestion layer.
    #[error("data set is missing")]
    DataSetMissing,

    /// The data batch is missing.
    #[error("data is missing")]
    DataMissing,

    /// The selector set is missing.
    ///
    /// Raised by `delete_data` for an empty selector set. At the repository
    /// boundary an absent selector set means "every record", so an empty set
    /// must never be forwarded.
    #[error("selectors is missing")]
    SelectorsMissing,

    /// The data set is owned by a different deduplicator.
    #[error("data set uses different deduplicator (expected {expected}, found {actual})")]
    DataSetUsesDifferentDeduplicator {
        /// Name of the policy that was asked to operate.
        expected: String,
        /// Name recorded on the data set.
        actual: String,
    },

    /// No identity fields were supplied for hashing.
    #[error("identity fields are missing")]
    IdentityFieldsMissing,

    /// One of the identity fields is the empty string.
    #[error("identity field is empty")]
    IdentityFieldEmpty,

    /// A datum could not produce its identity fields.
    #[error("unable to gather identity fields for datum")]
    IdentityFieldsUnavailable(#[source] Box<Self>),

    /// A datum's identity fields could not be hashed.
    #[error("unable to generate identity hash for datum")]
    IdentityHashUnavailable(#[source] Box<Self>),

    /// A datum is missing a value needed to describe it.
    #[error("invalid datum: {0}")]
    InvalidDatum(String),

    /// A deduplicator was constructed or registered with invalid parameters.
    #[error("invalid deduplicator: {0}")]
    InvalidDeduplicator(String),

    /// A hash-variant policy carries a name that maps to no known hash variant.
    #[error("unknown hash type: {0}")]
    UnknownHashType(String),

    /// No registered deduplicator claims or owns the data set.
    #[error("deduplicator not found for data set {data_set_id}")]
    DeduplicatorNotFound {
        /// Id of the unmatched data set.
        data_set_id: String,
    },

    /// The backing store failed.
    ///
    /// Produced by [`DataRepository`] implementations. The engine propagates
    /// it unchanged so callers can branch on the store operation.
    #[error("repository operation '{operation}' failed: {cause}")]
    Repository {
        /// The repository operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An ambient operation failed.
    ///
    /// Raised when:
    /// - A config file cannot be read or parsed
    /// - Logging is initialized twice or the log file cannot be opened
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true for errors raised before any repository call was issued.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::ContextCancelled { .. }
                | Self::ContextDeadlineExceeded { .. }
                | Self::DataSetMissing
                | Self::DataMissing
                | Self::SelectorsMissing
        )
    }
}

/// Result type alias for tidemark operations.
pub type Result<T> = std::result::Result<T, Error>;
