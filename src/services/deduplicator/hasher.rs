//! Identity hashing.
//!
//! An identity hash is the SHA-256 digest of a record's ordered identity
//! fields joined with `|`, encoded as standard base64. The separator never
//! occurs inside an identity field.

use crate::models::{Datum, IdentityFieldsVersion};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

const FIELD_SEPARATOR: &str = "|";

/// Generates the identity hash of an ordered field list.
///
/// # Errors
///
/// - [`Error::IdentityFieldsMissing`] if `fields` is empty
/// - [`Error::IdentityFieldEmpty`] if any field is the empty string
///
/// # Example
///
/// ```rust
/// use tidemark::generate_identity_hash;
///
/// let hash = generate_identity_hash(&["zero"]).unwrap();
/// assert_eq!(hash, "+RlOc/npRZ40UOoQoXnN93qvppW+7NO5NEqY0RFiIkM=");
/// ```
pub fn generate_identity_hash<S: AsRef<str>>(fields: &[S]) -> Result<String> {
    if fields.is_empty() {
        return Err(Error::IdentityFieldsMissing);
    }
    if fields.iter().any(|field| field.as_ref().is_empty()) {
        return Err(Error::IdentityFieldEmpty);
    }

    let mut hasher = Sha256::new();
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            hasher.update(FIELD_SEPARATOR.as_bytes());
        }
        hasher.update(field.as_ref().as_bytes());
    }
    Ok(STANDARD.encode(hasher.finalize()))
}

/// Computes and stores the identity hash of every record in the batch.
///
/// The hash is written to the record's deduplicator descriptor, creating the
/// descriptor if needed and preserving any other fields on it. Stops at the
/// first record that fails; records before it keep their new hashes.
///
/// # Errors
///
/// - [`Error::IdentityFieldsUnavailable`] if a record cannot produce its fields
/// - [`Error::IdentityHashUnavailable`] if a record's fields cannot be hashed
pub fn assign_data_set_data_identity_hashes(
    data: &mut [Box<dyn Datum>],
    version: IdentityFieldsVersion,
) -> Result<()> {
    for datum in data.iter_mut() {
        let fields = datum
            .identity_fields(version)
            .map_err(|e| Error::IdentityFieldsUnavailable(Box::new(e)))?;
        let hash = generate_identity_hash(&fields)
            .map_err(|e| Error::IdentityHashUnavailable(Box::new(e)))?;

        let mut descriptor = datum
            .deduplicator_descriptor()
            .cloned()
            .unwrap_or_default();
        descriptor.hash = Some(hash);
        datum.set_deduplicator_descriptor(Some(descriptor));
    }

    tracing::debug!(count = data.len(), version = %version, "Assigned identity hashes");
    Ok(())
}
