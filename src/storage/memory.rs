//! In-memory storage backend.
//!
//! Thread-safe implementation of [`RecordStore`] behind a single `RwLock`.
//! Every write holds the lock for the whole update, which gives each call
//! the all-or-nothing behavior the trait requires. It is intended for
//! embedded usage, tests, and as a reference implementation.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use crate::key::EntityKey;
use crate::merge::{Contributor, CounterIncrements, DescriptionCandidate, RecordUpdate};
use crate::record::EntityRecord;
use crate::storage::traits::{AppliedUpdate, RecordStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct RecordState {
    records: HashMap<EntityKey, EntityRecord>,
    by_contributor: HashMap<String, BTreeSet<EntityKey>>,
}

impl RecordState {
    fn existing_mut(&mut self, key: &EntityKey) -> Result<&mut EntityRecord, StorageError> {
        self.records
            .get_mut(key)
            .ok_or_else(|| StorageError::RecordNotFound(key.clone()))
    }

    fn index_contributor(&mut self, key: &EntityKey, contributor: &Contributor) {
        self.by_contributor
            .entry(contributor.id.clone())
            .or_default()
            .insert(key.clone());
    }
}

fn bump_revision(record: &mut EntityRecord) {
    record.revision = record.revision.saturating_add(1);
}

/// Thread-safe in-memory record store with a contributor index.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: RwLock<RecordState>,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, key: &EntityKey) -> Result<Option<EntityRecord>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("record.get"))?;
        Ok(state.records.get(key).cloned())
    }

    fn upsert_counters(
        &self,
        key: &EntityKey,
        increments: &CounterIncrements,
    ) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("record.upsert_counters"))?;
        let record = state
            .records
            .entry(key.clone())
            .or_insert_with(|| EntityRecord::new(key.clone(), increments.recognized_at));
        record.apply_counters(increments);
        bump_revision(record);
        Ok(())
    }

    fn upsert_description(
        &self,
        key: &EntityKey,
        candidate: &DescriptionCandidate,
    ) -> Result<bool, StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("record.upsert_description"))?;
        let record = state.existing_mut(key)?;
        let adopted = record.offer_description(candidate);
        if adopted {
            bump_revision(record);
        }
        Ok(adopted)
    }

    fn upsert_contributor(
        &self,
        key: &EntityKey,
        contributor: &Contributor,
    ) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("record.upsert_contributor"))?;
        let record = state.existing_mut(key)?;
        record.set_contributor(contributor);
        bump_revision(record);
        state.index_contributor(key, contributor);
        Ok(())
    }

    fn apply(
        &self,
        key: &EntityKey,
        update: &RecordUpdate,
    ) -> Result<AppliedUpdate, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("record.apply"))?;

        let created = !state.records.contains_key(key);
        let record = state
            .records
            .entry(key.clone())
            .or_insert_with(|| EntityRecord::new(key.clone(), update.counters.recognized_at));
        let description_adopted = record.apply(update);
        bump_revision(record);
        let record = record.clone();

        if let Some(contributor) = update.contributor.as_ref() {
            state.index_contributor(key, contributor);
        }

        Ok(AppliedUpdate {
            record,
            created,
            description_adopted,
        })
    }

    fn scan_all(&self) -> Result<Vec<EntityRecord>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("record.scan_all"))?;
        Ok(state.records.values().cloned().collect())
    }

    fn keys_for_contributor(
        &self,
        contributor_id: &str,
    ) -> Result<Option<Vec<EntityKey>>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("record.keys_for_contributor"))?;
        Ok(Some(
            state
                .by_contributor
                .get(contributor_id)
                .map(|keys| keys.iter().cloned().collect())
                .unwrap_or_default(),
        ))
    }

    fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("record.len"))?;
        Ok(state.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    use chrono::Utc;

    use crate::config::EngineConfig;
    use crate::field::ScalarField;
    use crate::sample::Sample;

    fn key() -> EntityKey {
        EntityKey::from_parts("Cohiba", "Siglo II")
    }

    fn update_for(sample: &Sample) -> RecordUpdate {
        RecordUpdate::from_sample(sample, Utc::now(), &EngineConfig::default()).0
    }

    #[test]
    fn apply_creates_then_merges() {
        let store = InMemoryRecordStore::new();
        let sample = Sample::new("Cohiba", "Siglo II").with_scalar(ScalarField::Origin, "Cuba");

        let first = store.apply(&key(), &update_for(&sample)).unwrap();
        assert!(first.created);
        assert_eq!(first.record.revision, 1);

        let second = store.apply(&key(), &update_for(&sample)).unwrap();
        assert!(!second.created);
        assert_eq!(second.record.total_recognitions, 2);
        assert_eq!(second.record.scalar(ScalarField::Origin).unwrap().get("Cuba"), 2);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn single_value_upserts_require_existing_record() {
        let store = InMemoryRecordStore::new();
        let candidate = DescriptionCandidate {
            text: "Cedar".to_string(),
            confidence: 0.5,
            at: Utc::now(),
        };
        let err = store.upsert_description(&key(), &candidate).unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));

        let err = store
            .upsert_contributor(&key(), &Contributor::new("u-1", "Ana"))
            .unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn granular_upserts_compose() {
        let store = InMemoryRecordStore::new();
        let now = Utc::now();
        store.upsert_counters(&key(), &CounterIncrements::new(now)).unwrap();

        let candidate = DescriptionCandidate {
            text: "Cedar".to_string(),
            confidence: 0.5,
            at: now,
        };
        assert!(store.upsert_description(&key(), &candidate).unwrap());
        store
            .upsert_contributor(&key(), &Contributor::new("u-1", "Ana"))
            .unwrap();

        let record = store.get(&key()).unwrap().unwrap();
        assert_eq!(record.total_recognitions, 1);
        assert_eq!(record.description.unwrap().text, "Cedar");
        assert_eq!(record.revision, 3);
        assert_eq!(
            store.keys_for_contributor("u-1").unwrap(),
            Some(vec![key()])
        );
    }

    #[test]
    fn contributor_index_tracks_every_key() {
        let store = InMemoryRecordStore::new();
        let a = Sample::new("Cohiba", "Siglo II").with_contributor("u-1", "Ana");
        let b = Sample::new("Padron", "1964").with_contributor("u-1", "Ana R.");
        store.apply(&a.key(), &update_for(&a)).unwrap();
        store.apply(&b.key(), &update_for(&b)).unwrap();

        let keys = store.keys_for_contributor("u-1").unwrap().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(store.keys_for_contributor("nobody").unwrap().unwrap().is_empty());
    }

    #[test]
    fn concurrent_applies_lose_no_increments() {
        let store = Arc::new(InMemoryRecordStore::new());
        let threads = 8;
        let per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let origin = if t % 2 == 0 { "Cuba" } else { "Nicaragua" };
                    let sample = Sample::new("Cohiba", "Siglo II")
                        .with_scalar(ScalarField::Origin, origin)
                        .with_rating(90.0);
                    for _ in 0..per_thread {
                        store.apply(&key(), &update_for(&sample)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let record = store.get(&key()).unwrap().unwrap();
        let total = threads * per_thread;
        assert_eq!(record.total_recognitions, total);
        assert_eq!(record.rating_count, total);
        let origins = record.scalar(ScalarField::Origin).unwrap();
        assert_eq!(origins.get("Cuba"), total / 2);
        assert_eq!(origins.get("Nicaragua"), total / 2);
        assert_eq!(record.revision, total);
    }
}
