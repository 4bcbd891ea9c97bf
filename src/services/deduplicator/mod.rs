//! Deduplicator policies.
//!
//! A data set is owned by exactly one deduplicator, chosen when the data set
//! is first seen and recorded on it by name. The deduplicator decides how each
//! uploaded batch is reconciled with what is already stored.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      DeduplicatorFactory                         │
//! │   ordered registry: first `claims` wins, `owns` re-resolves      │
//! │                                                                  │
//! │  ┌───────────────┐ ┌───────────────┐ ┌────────────────────────┐  │
//! │  │ Origin        │ │ Device        │ │ Hash / None            │  │
//! │  │ delete.origin │ │ deactivate    │ │ dataset.drop.hash      │  │
//! │  │ .older        │ │ (platform,    │ │ none                   │  │
//! │  │               │ │  legacy)      │ │                        │  │
//! │  │               │ │ truncate      │ │                        │  │
//! │  └───────┬───────┘ └───────┬───────┘ └───────────┬────────────┘  │
//! │          └─────────────────┼─────────────────────┘               │
//! │                    BaseDeduplicator                              │
//! └────────────────────────────┼─────────────────────────────────────┘
//!                              ▼
//!                       dyn DataRepository
//! ```
//!
//! # Example
//!
//! ```rust
//! use tidemark::models::Glucose;
//! use tidemark::{Data, DataSet, DeduplicatorFactory, InMemoryDataRepository, RequestContext};
//!
//! let repository = InMemoryDataRepository::new();
//! let data_set = repository
//!     .create_data_set(
//!         DataSet::new("upload-1", "user-1")
//!             .with_device_id("device-1")
//!             .with_device(&["Abbott"], "FreeStyle Libre"),
//!     )
//!     .unwrap();
//!
//! let factory = DeduplicatorFactory::new();
//! let ctx = RequestContext::new();
//! let deduplicator = factory.require_new(&data_set).unwrap();
//! let data_set = deduplicator.open(&ctx, &repository, &data_set).unwrap();
//!
//! let mut reading = Glucose::cbg("mg/dL", 112.0);
//! reading.base.device_id = Some("device-1".to_string());
//! reading.base.user_id = Some("user-1".to_string());
//! reading.base.time = Some(chrono::Utc::now());
//! let mut data: Data = vec![Box::new(reading)];
//!
//! deduplicator.add_data(&ctx, &repository, &data_set, &mut data).unwrap();
//! deduplicator.close(&ctx, &repository, &data_set).unwrap();
//! assert!(repository.data_set("upload-1").unwrap().active);
//! ```

mod base;
mod config;
mod delete_origin;
mod delete_origin_older;
mod device_deactivate_hash;
mod device_truncate;
pub mod devices;
mod drop_hash;
mod factory;
mod hasher;
pub mod names;
mod none;
mod types;

pub use base::{BaseDeduplicator, is_valid_name, is_valid_version};
pub use config::{DEFAULT_DELETE_ORIGIN_OLDER_TYPES, DeduplicatorConfig};
pub use delete_origin::{DeleteOriginBase, DeleteOriginDeduplicator, DeleteOriginProvider, ReplaceOrigins};
pub use delete_origin_older::{DeleteOriginOlderDeduplicator, NewerOriginFilter};
pub use device_deactivate_hash::{DeviceDeactivateHashDeduplicator, HashVariant};
pub use device_truncate::DeviceTruncateDataSetDeduplicator;
pub use drop_hash::DropHashDeduplicator;
pub use factory::DeduplicatorFactory;
pub use hasher::{assign_data_set_data_identity_hashes, generate_identity_hash};
pub use none::NoneDeduplicator;
pub use types::Deduplicator;
