//! Entity records: the accumulated statistics for one key.
//!
//! A record only ever grows. Counters are non-decreasing, contributors are
//! never removed, and there is no deletion path. The only non-monotonic
//! state is the description, which is replaced as a single unit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::{ArrayField, ScalarField};
use crate::key::EntityKey;
use crate::merge::{Contributor, CounterIncrements, DescriptionCandidate, RecordUpdate};

/// Grow-only value→count map.
///
/// Merging two maps sums matching entries, so merges commute and associate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterMap(BTreeMap<String, u64>);

impl CounterMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `by` to the counter for `value`.
    pub fn increment(&mut self, value: &str, by: u64) {
        if by == 0 {
            return;
        }
        match self.0.get_mut(value) {
            Some(count) => *count = count.saturating_add(by),
            None => {
                self.0.insert(value.to_string(), by);
            }
        }
    }

    /// Folds every counter of `other` into this map.
    pub fn merge(&mut self, other: &Self) {
        for (value, &count) in &other.0 {
            self.increment(value, count);
        }
    }

    /// Count recorded for `value` (0 if never seen).
    #[must_use]
    pub fn get(&self, value: &str) -> u64 {
        self.0.get(value).copied().unwrap_or(0)
    }

    /// Sum of all counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().fold(0u64, |acc, &c| acc.saturating_add(c))
    }

    /// Number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no value has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(v, &c)| (v.as_str(), c))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CounterMap {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (value, count) in iter {
            map.increment(&value.into(), count);
        }
        map
    }
}

/// The description currently judged best, with the evidence for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionState {
    /// Description text.
    pub text: String,
    /// Confidence the adopting sample reported.
    pub confidence: f64,
    /// When the description was adopted.
    pub updated_at: DateTime<Utc>,
}

impl DescriptionState {
    /// Returns true if `candidate` should replace this description.
    ///
    /// Higher confidence wins. Equal confidence also wins, so the most recent
    /// of equally-confident descriptions is kept.
    #[must_use]
    pub fn yields_to(&self, candidate: &DescriptionCandidate) -> bool {
        candidate.confidence >= self.confidence
    }
}

impl From<&DescriptionCandidate> for DescriptionState {
    fn from(candidate: &DescriptionCandidate) -> Self {
        Self {
            text: candidate.text.clone(),
            confidence: candidate.confidence,
            updated_at: candidate.at,
        }
    }
}

/// Accumulated statistics for one entity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Normalized key; never changes after creation.
    pub key: EntityKey,
    /// Per-field counters for single-valued attributes.
    pub scalar_stats: BTreeMap<ScalarField, CounterMap>,
    /// Per-field counters for multi-valued attributes.
    pub array_stats: BTreeMap<ArrayField, CounterMap>,
    /// Sum of accepted ratings.
    pub rating_sum: f64,
    /// Number of accepted ratings.
    pub rating_count: u64,
    /// Best description so far.
    pub description: Option<DescriptionState>,
    /// Contributor id → most recent display name.
    pub contributors: BTreeMap<String, String>,
    /// Accepted samples merged into this record.
    pub total_recognitions: u64,
    /// Time of the most recent accepted sample.
    pub last_recognized_at: DateTime<Utc>,
    /// Time of the sample that created the record.
    pub created_at: DateTime<Utc>,
    /// Number of store writes applied; bumped by the store.
    pub revision: u64,
}

impl EntityRecord {
    /// Creates an empty record, before any sample has been merged.
    #[must_use]
    pub fn new(key: EntityKey, at: DateTime<Utc>) -> Self {
        Self {
            key,
            scalar_stats: BTreeMap::new(),
            array_stats: BTreeMap::new(),
            rating_sum: 0.0,
            rating_count: 0,
            description: None,
            contributors: BTreeMap::new(),
            total_recognitions: 0,
            last_recognized_at: at,
            created_at: at,
            revision: 0,
        }
    }

    /// Counters for a scalar field, if any value has been seen.
    #[must_use]
    pub fn scalar(&self, field: ScalarField) -> Option<&CounterMap> {
        self.scalar_stats.get(&field)
    }

    /// Counters for an array field, if any value has been seen.
    #[must_use]
    pub fn array(&self, field: ArrayField) -> Option<&CounterMap> {
        self.array_stats.get(&field)
    }

    /// Mean of accepted ratings, or `None` when none were accepted.
    #[must_use]
    pub fn rating_mean(&self) -> Option<f64> {
        if self.rating_count == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.rating_count as f64;
        Some(self.rating_sum / count)
    }

    /// Returns true if `contributor_id` has submitted to this record.
    #[must_use]
    pub fn has_contributor(&self, contributor_id: &str) -> bool {
        self.contributors.contains_key(contributor_id)
    }

    /// Adds commutative counter increments.
    pub fn apply_counters(&mut self, increments: &CounterIncrements) {
        for (field, counts) in &increments.scalars {
            if !counts.is_empty() {
                self.scalar_stats.entry(*field).or_default().merge(counts);
            }
        }
        for (field, counts) in &increments.arrays {
            if !counts.is_empty() {
                self.array_stats.entry(*field).or_default().merge(counts);
            }
        }
        self.rating_sum += increments.rating_sum;
        self.rating_count = self.rating_count.saturating_add(increments.rating_count);
        self.total_recognitions = self
            .total_recognitions
            .saturating_add(increments.recognitions);
        if increments.recognitions > 0 && increments.recognized_at > self.last_recognized_at {
            self.last_recognized_at = increments.recognized_at;
        }
    }

    /// Offers a description; returns true if it was adopted.
    pub fn offer_description(&mut self, candidate: &DescriptionCandidate) -> bool {
        let adopt = self
            .description
            .as_ref()
            .map_or(true, |current| current.yields_to(candidate));
        if adopt {
            self.description = Some(DescriptionState::from(candidate));
        }
        adopt
    }

    /// Records a contributor, refreshing the display name if already known.
    pub fn set_contributor(&mut self, contributor: &Contributor) {
        self.contributors
            .insert(contributor.id.clone(), contributor.name.clone());
    }

    /// Applies every change implied by one sample; returns true if the
    /// sample's description was adopted.
    pub fn apply(&mut self, update: &RecordUpdate) -> bool {
        self.apply_counters(&update.counters);
        let adopted = update
            .description
            .as_ref()
            .is_some_and(|candidate| self.offer_description(candidate));
        if let Some(contributor) = update.contributor.as_ref() {
            self.set_contributor(contributor);
        }
        adopted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    fn candidate(text: &str, confidence: f64, at: DateTime<Utc>) -> DescriptionCandidate {
        DescriptionCandidate {
            text: text.to_string(),
            confidence,
            at,
        }
    }

    #[test]
    fn counter_map_merge_is_commutative() {
        let a: CounterMap = [("Cuba", 2), ("Nicaragua", 1)].into_iter().collect();
        let b: CounterMap = [("Cuba", 1), ("Honduras", 4)].into_iter().collect();

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        assert_eq!(ab, ba);
        assert_eq!(ab.get("Cuba"), 3);
        assert_eq!(ab.total(), 8);
        assert_eq!(ab.len(), 3);
    }

    #[test]
    fn counter_map_ignores_zero_increments() {
        let mut map = CounterMap::new();
        map.increment("Cuba", 0);
        assert!(map.is_empty());
        assert_eq!(map.get("Cuba"), 0);
    }

    #[test]
    fn rating_mean_is_none_without_ratings() {
        let record = EntityRecord::new(EntityKey::from_parts("a", "b"), Utc::now());
        assert_eq!(record.rating_mean(), None);
    }

    #[test]
    fn description_rules_follow_confidence_then_recency() {
        let t0 = Utc::now();
        let mut record = EntityRecord::new(EntityKey::from_parts("a", "b"), t0);

        assert!(record.offer_description(&candidate("first", 0.9, t0)));
        assert!(!record.offer_description(&candidate("weaker", 0.5, t0 + Duration::seconds(1))));
        assert_eq!(record.description.as_ref().unwrap().text, "first");

        let t2 = t0 + Duration::seconds(2);
        assert!(record.offer_description(&candidate("stronger", 0.95, t2)));
        let state = record.description.as_ref().unwrap();
        assert_eq!(state.text, "stronger");
        assert_eq!(state.confidence, 0.95);
        assert_eq!(state.updated_at, t2);

        let t3 = t0 + Duration::seconds(3);
        assert!(record.offer_description(&candidate("tie", 0.95, t3)));
        assert_eq!(record.description.as_ref().unwrap().text, "tie");
    }

    #[test]
    fn last_recognized_at_never_moves_backwards() {
        let t0 = Utc::now();
        let mut record = EntityRecord::new(EntityKey::from_parts("a", "b"), t0);
        let mut increments = CounterIncrements::new(t0 + Duration::seconds(10));
        record.apply_counters(&increments);
        increments.recognized_at = t0;
        record.apply_counters(&increments);
        assert_eq!(record.last_recognized_at, t0 + Duration::seconds(10));
        assert_eq!(record.total_recognitions, 2);
    }
}
