//! Field merge rules.
//!
//! A sample is turned into a [`RecordUpdate`] before the store is touched.
//! Planning is pure: every check that can drop a field runs here, so the
//! store only ever sees a fully-formed update and applies it as one unit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::field::{ArrayField, ScalarField};
use crate::record::CounterMap;
use crate::sample::{MalformedField, Sample};

/// Commutative part of an update: counters and running sums.
///
/// Applying two increments in either order yields the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterIncrements {
    /// Scalar counter deltas.
    pub scalars: BTreeMap<ScalarField, CounterMap>,
    /// Array counter deltas.
    pub arrays: BTreeMap<ArrayField, CounterMap>,
    /// Amount to add to the rating sum.
    pub rating_sum: f64,
    /// Amount to add to the rating count.
    pub rating_count: u64,
    /// Amount to add to the recognition total.
    pub recognitions: u64,
    /// Ingestion time of the sample.
    pub recognized_at: DateTime<Utc>,
}

impl CounterIncrements {
    /// Increments for a single accepted sample with no attributes.
    #[must_use]
    pub fn new(recognized_at: DateTime<Utc>) -> Self {
        Self {
            scalars: BTreeMap::new(),
            arrays: BTreeMap::new(),
            rating_sum: 0.0,
            rating_count: 0,
            recognitions: 1,
            recognized_at,
        }
    }

    /// Counts one observation of a scalar value.
    pub fn count_scalar(&mut self, field: ScalarField, value: &str) {
        self.scalars.entry(field).or_default().increment(value, 1);
    }

    /// Counts one observation of an array element.
    pub fn count_array(&mut self, field: ArrayField, value: &str) {
        self.arrays.entry(field).or_default().increment(value, 1);
    }

    /// Adds one rating.
    pub fn add_rating(&mut self, rating: f64) {
        self.rating_sum += rating;
        self.rating_count += 1;
    }
}

/// Description offered by a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionCandidate {
    /// Trimmed description text.
    pub text: String,
    /// Confidence, 0.0 when the sample did not report one.
    pub confidence: f64,
    /// Ingestion time of the sample.
    pub at: DateTime<Utc>,
}

/// Identified submitter of a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl Contributor {
    /// Creates a contributor entry.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Every change one accepted sample makes to its record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    /// Counter deltas.
    pub counters: CounterIncrements,
    /// Description to offer, if the sample carried one.
    pub description: Option<DescriptionCandidate>,
    /// Contributor to record, if both id and name were supplied.
    pub contributor: Option<Contributor>,
}

impl RecordUpdate {
    /// Plans the update for a validated sample.
    ///
    /// Returns the update together with every field that was dropped.
    /// Intra-sample duplicates in array fields are counted once per
    /// occurrence.
    #[must_use]
    pub fn from_sample(
        sample: &Sample,
        at: DateTime<Utc>,
        config: &EngineConfig,
    ) -> (Self, Vec<MalformedField>) {
        let mut malformed = Vec::new();
        let mut counters = CounterIncrements::new(at);

        for field in ScalarField::ALL {
            if let Some(value) = sample.scalar(field).and_then(non_blank) {
                counters.count_scalar(field, value);
            }
        }

        for field in ArrayField::ALL {
            for value in sample.array(field).iter().filter_map(|v| non_blank(v)) {
                counters.count_array(field, value);
            }
        }

        if let Some(rating) = sample.rating {
            if config.rating.contains(rating) {
                counters.add_rating(rating);
            } else {
                malformed.push(MalformedField::new(
                    "rating",
                    format!(
                        "{rating} is outside [{}, {}]",
                        config.rating.min, config.rating.max
                    ),
                ));
            }
        }

        let description = sample.description.as_deref().and_then(non_blank).map(|text| {
            DescriptionCandidate {
                text: text.to_string(),
                confidence: sanitize_confidence(sample.confidence, &mut malformed),
                at,
            }
        });

        let contributor = match (
            sample.contributor_id.as_deref().and_then(non_blank),
            sample.contributor_name.as_deref().and_then(non_blank),
        ) {
            (Some(id), Some(name)) => Some(Contributor::new(id, name)),
            _ => None,
        };

        (
            Self {
                counters,
                description,
                contributor,
            },
            malformed,
        )
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn sanitize_confidence(confidence: Option<f64>, malformed: &mut Vec<MalformedField>) -> f64 {
    match confidence {
        None => 0.0,
        Some(c) if c.is_finite() && (0.0..=1.0).contains(&c) => c,
        Some(c) => {
            malformed.push(MalformedField::new(
                "confidence",
                format!("{c} is outside [0, 1]; treated as 0"),
            ));
            0.0
        }
    }
}
