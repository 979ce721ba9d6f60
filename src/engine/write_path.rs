//! Engine write path: sample ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::ConsensusEngine;
use crate::error::{TallyResult, ValidationError};
use crate::key::EntityKey;
use crate::merge::RecordUpdate;
use crate::sample::{MalformedField, Sample};

/// Result of an accepted sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    /// Key the sample was merged into.
    pub key: EntityKey,
    /// True if this sample created the record.
    pub created: bool,
    /// Recognition total after the merge.
    pub total_recognitions: u64,
    /// True if the sample's description became the record's description.
    pub description_adopted: bool,
    /// Fields dropped from the sample; the rest merged normally.
    pub skipped: Vec<MalformedField>,
}

impl ConsensusEngine {
    /// Merge a sample, stamped with the current time.
    ///
    /// # Errors
    ///
    /// - `Validation`: brand or name missing; nothing is written
    /// - `Storage`: the store failed; the record is unchanged
    pub fn ingest(&self, sample: &Sample) -> TallyResult<IngestReceipt> {
        self.ingest_at(sample, Utc::now())
    }

    /// Merge a sample as if it arrived at `at`.
    ///
    /// # Errors
    ///
    /// See [`ConsensusEngine::ingest`].
    pub fn ingest_at(&self, sample: &Sample, at: DateTime<Utc>) -> TallyResult<IngestReceipt> {
        self.merge(sample, at, Vec::new())
    }

    /// Parse a loosely-typed JSON sample and merge it.
    ///
    /// Fields dropped while parsing are reported in the receipt alongside
    /// those dropped while merging.
    ///
    /// # Errors
    ///
    /// See [`ConsensusEngine::ingest`].
    pub fn ingest_json(&self, value: &Value) -> TallyResult<IngestReceipt> {
        let parsed = Sample::from_json(value)?;
        self.merge(&parsed.sample, Utc::now(), parsed.malformed)
    }

    fn merge(
        &self,
        sample: &Sample,
        at: DateTime<Utc>,
        mut skipped: Vec<MalformedField>,
    ) -> TallyResult<IngestReceipt> {
        sample.validate()?;
        let key = sample.key();
        if key.is_empty() {
            return Err(ValidationError::EmptyKey {
                brand: sample.brand.clone(),
                name: sample.name.clone(),
            }
            .into());
        }

        let (update, malformed) = RecordUpdate::from_sample(sample, at, self.config());
        skipped.extend(malformed);
        for field in &skipped {
            warn!(key = %key, field = %field.field, reason = %field.reason, "skipped malformed field");
        }

        let applied = self.store().apply(&key, &update).map_err(|e| {
            warn!(key = %key, error = %e, "store rejected sample update");
            e
        })?;

        debug!(
            key = %key,
            created = applied.created,
            total = applied.record.total_recognitions,
            description_adopted = applied.description_adopted,
            "merged sample"
        );

        Ok(IngestReceipt {
            key,
            created: applied.created,
            total_recognitions: applied.record.total_recognitions,
            description_adopted: applied.description_adopted,
            skipped,
        })
    }
}
