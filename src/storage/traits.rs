//! Abstract storage traits for kyro-tally.
//!
//! The engine never reads-modifies-writes a record itself. It hands the
//! store a fully planned update and the store applies it atomically, so a
//! backend can map counters onto native increment operations and the
//! description onto a conditional write.

use thiserror::Error;

use crate::key::EntityKey;
use crate::merge::{Contributor, CounterIncrements, DescriptionCandidate, RecordUpdate};
use crate::record::EntityRecord;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record not found.
    #[error("Record not found: {0}")]
    RecordNotFound(EntityKey),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed. Raised by backends that encode records.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Connection failed. Raised by backends that talk to a remote service.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Storage trait for entity records.
///
/// # Atomicity
/// - Each method is a single atomic unit: it either fully applies or leaves
///   the record untouched.
/// - `apply` must cover counters, description and contributor of one sample
///   in one unit.
/// - Counter increments must never be lost under concurrent callers.
pub trait RecordStore: Send + Sync {
    /// Get a record by key.
    fn get(&self, key: &EntityKey) -> Result<Option<EntityRecord>, StorageError>;

    /// Add counter increments, creating the record if absent.
    fn upsert_counters(
        &self,
        key: &EntityKey,
        increments: &CounterIncrements,
    ) -> Result<(), StorageError>;

    /// Offer a description; the store evaluates the adoption rule against
    /// the stored value. Returns true if adopted.
    ///
    /// # Errors
    /// - `RecordNotFound`: if the record does not exist
    fn upsert_description(
        &self,
        key: &EntityKey,
        candidate: &DescriptionCandidate,
    ) -> Result<bool, StorageError>;

    /// Set a contributor's display name.
    ///
    /// # Errors
    /// - `RecordNotFound`: if the record does not exist
    fn upsert_contributor(
        &self,
        key: &EntityKey,
        contributor: &Contributor,
    ) -> Result<(), StorageError>;

    /// Apply every change of one sample as one unit, creating the record if
    /// absent. Returns the record as written and whether the description
    /// was adopted.
    fn apply(
        &self,
        key: &EntityKey,
        update: &RecordUpdate,
    ) -> Result<AppliedUpdate, StorageError>;

    /// Snapshot every record.
    fn scan_all(&self) -> Result<Vec<EntityRecord>, StorageError>;

    /// Keys a contributor has touched, if the backend maintains an index.
    ///
    /// `Ok(None)` means the backend has no index and callers must scan.
    fn keys_for_contributor(
        &self,
        _contributor_id: &str,
    ) -> Result<Option<Vec<EntityKey>>, StorageError> {
        Ok(None)
    }

    /// Number of stored records.
    fn len(&self) -> Result<usize, StorageError>;

    /// Returns true if no record is stored.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Outcome of [`RecordStore::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUpdate {
    /// Record after the update.
    pub record: EntityRecord,
    /// True if this update created the record.
    pub created: bool,
    /// True if the offered description was adopted.
    pub description_adopted: bool,
}
