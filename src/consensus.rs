//! Consensus extraction.
//!
//! [`derive_consensus`] is the single read path: the per-key lookup and the
//! contributor scan both call it on records fetched from the store. It is a
//! pure function of the record and the limits.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TopNLimits;
use crate::field::{ArrayField, ScalarField};
use crate::key::EntityKey;
use crate::record::{CounterMap, EntityRecord};

/// One entry of a ranked list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedValue {
    /// Observed value.
    pub value: String,
    /// Times it was observed.
    pub count: u64,
    /// Share of all observations of the field, 0 to 100.
    pub percentage: f64,
}

/// Contributor entry in a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorEntry {
    /// Stable identifier.
    pub id: String,
    /// Most recent display name.
    pub name: String,
}

/// Read-time summary of an entity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusView {
    /// Record key.
    pub key: EntityKey,
    /// Most common brand spelling.
    pub brand: Option<String>,
    /// Share of brand observations agreeing with `brand`.
    pub brand_consistency: f64,
    /// Most common name spelling.
    pub name: Option<String>,
    /// Share of name observations agreeing with `name`.
    pub name_consistency: f64,
    /// Most common origin.
    pub origin: Option<String>,
    /// Share of origin observations agreeing with `origin`.
    pub origin_consistency: f64,
    /// Most common strength.
    pub strength: Option<String>,
    /// Share of strength observations agreeing with `strength`.
    pub strength_consistency: f64,
    /// Best description.
    pub description: Option<String>,
    /// Confidence behind `description`.
    pub description_confidence: Option<f64>,
    /// Mean rating, `None` when no rating was accepted.
    pub rating: Option<f64>,
    /// Number of accepted ratings.
    pub rating_count: u64,
    /// Ranked wrappers.
    pub wrappers: Vec<RankedValue>,
    /// Ranked binders.
    pub binders: Vec<RankedValue>,
    /// Ranked fillers.
    pub fillers: Vec<RankedValue>,
    /// Ranked flavor descriptors.
    pub flavor_profile: Vec<RankedValue>,
    /// Ranked first-third notes.
    pub foot_taste_notes: Vec<RankedValue>,
    /// Ranked second-third notes.
    pub body_taste_notes: Vec<RankedValue>,
    /// Ranked final-third notes.
    pub head_taste_notes: Vec<RankedValue>,
    /// Accepted samples.
    pub total_recognitions: u64,
    /// Time of the most recent accepted sample.
    pub last_recognized_at: DateTime<Utc>,
    /// Contributors, ordered by id.
    pub contributors: Vec<ContributorEntry>,
    /// Number of distinct contributor ids.
    pub unique_contributors: usize,
}

/// Orders entries by count descending, then value ascending.
fn rank_order(a: &(&str, u64), b: &(&str, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = count as f64 / total as f64 * 100.0;
    pct
}

/// Ranks a counter map, keeping at most `limit` entries.
///
/// Percentages are relative to the sum of every counter, not only the kept
/// ones.
#[must_use]
pub fn rank(counts: &CounterMap, limit: usize) -> Vec<RankedValue> {
    let total = counts.total();
    let mut entries: Vec<(&str, u64)> = counts.iter().collect();
    entries.sort_by(rank_order);
    entries
        .into_iter()
        .take(limit)
        .map(|(value, count)| RankedValue {
            value: value.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

/// Most common value and its consistency percentage.
///
/// Ties go to the lexicographically smallest value. An empty map yields
/// `(None, 0.0)`.
#[must_use]
pub fn top_value(counts: &CounterMap) -> (Option<String>, f64) {
    let total = counts.total();
    counts
        .iter()
        .min_by(rank_order)
        .map_or((None, 0.0), |(value, count)| {
            (Some(value.to_string()), percentage(count, total))
        })
}

/// Builds the consensus view of a record.
#[must_use]
pub fn derive_consensus(record: &EntityRecord, limits: &TopNLimits) -> ConsensusView {
    let empty = CounterMap::new();
    let scalar = |field: ScalarField| top_value(record.scalar(field).unwrap_or(&empty));
    let ranked_scalar = |field: ScalarField| {
        rank(record.scalar(field).unwrap_or(&empty), limits.for_scalar(field))
    };
    let ranked_array =
        |field: ArrayField| rank(record.array(field).unwrap_or(&empty), limits.for_array(field));

    let (brand, brand_consistency) = scalar(ScalarField::Brand);
    let (name, name_consistency) = scalar(ScalarField::Name);
    let (origin, origin_consistency) = scalar(ScalarField::Origin);
    let (strength, strength_consistency) = scalar(ScalarField::Strength);

    let contributors: Vec<ContributorEntry> = record
        .contributors
        .iter()
        .map(|(id, name)| ContributorEntry {
            id: id.clone(),
            name: name.clone(),
        })
        .collect();

    ConsensusView {
        key: record.key.clone(),
        brand,
        brand_consistency,
        name,
        name_consistency,
        origin,
        origin_consistency,
        strength,
        strength_consistency,
        description: record.description.as_ref().map(|d| d.text.clone()),
        description_confidence: record.description.as_ref().map(|d| d.confidence),
        rating: record.rating_mean(),
        rating_count: record.rating_count,
        wrappers: ranked_scalar(ScalarField::Wrapper),
        binders: ranked_scalar(ScalarField::Binder),
        fillers: ranked_scalar(ScalarField::Filler),
        flavor_profile: ranked_array(ArrayField::FlavorProfile),
        foot_taste_notes: ranked_array(ArrayField::FootTasteNotes),
        body_taste_notes: ranked_array(ArrayField::BodyTasteNotes),
        head_taste_notes: ranked_array(ArrayField::HeadTasteNotes),
        total_recognitions: record.total_recognitions,
        last_recognized_at: record.last_recognized_at,
        unique_contributors: contributors.len(),
        contributors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::merge::{Contributor, CounterIncrements};

    fn counts(entries: &[(&str, u64)]) -> CounterMap {
        entries.iter().map(|&(v, c)| (v, c)).collect()
    }

    #[test]
    fn top_value_breaks_ties_lexicographically() {
        let map = counts(&[("Nicaragua", 2), ("Honduras", 2), ("Cuba", 1)]);
        let (value, consistency) = top_value(&map);
        assert_eq!(value.as_deref(), Some("Honduras"));
        assert!((consistency - 40.0).abs() < 1e-9);
    }

    #[test]
    fn top_value_of_empty_map() {
        assert_eq!(top_value(&CounterMap::new()), (None, 0.0));
    }

    #[test]
    fn rank_truncates_and_orders() {
        let map = counts(&[
            ("cedar", 3),
            ("leather", 5),
            ("cocoa", 3),
            ("pepper", 1),
            ("coffee", 3),
        ]);
        let ranked = rank(&map, 3);
        let values: Vec<&str> = ranked.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, ["leather", "cedar", "cocoa"]);
        assert!((ranked[0].percentage - 5.0 / 15.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn rank_with_zero_limit_is_empty() {
        assert!(rank(&counts(&[("cedar", 1)]), 0).is_empty());
    }

    #[test]
    fn derive_consensus_on_fresh_record() {
        let record = EntityRecord::new(EntityKey::from_parts("a", "b"), Utc::now());
        let view = derive_consensus(&record, &TopNLimits::default());
        assert_eq!(view.brand, None);
        assert_eq!(view.brand_consistency, 0.0);
        assert_eq!(view.rating, None);
        assert!(view.wrappers.is_empty());
        assert_eq!(view.unique_contributors, 0);
    }

    #[test]
    fn derive_consensus_reports_every_section() {
        let now = Utc::now();
        let mut record = EntityRecord::new(EntityKey::from_parts("Cohiba", "Siglo II"), now);
        let mut incr = CounterIncrements::new(now);
        incr.count_scalar(ScalarField::Brand, "Cohiba");
        incr.count_scalar(ScalarField::Wrapper, "Cuban");
        incr.count_array(ArrayField::FlavorProfile, "cedar");
        incr.add_rating(88.0);
        record.apply_counters(&incr);
        record.set_contributor(&Contributor::new("u-2", "Ben"));
        record.set_contributor(&Contributor::new("u-1", "Ana"));

        let view = derive_consensus(&record, &TopNLimits::default());
        assert_eq!(view.brand.as_deref(), Some("Cohiba"));
        assert!((view.brand_consistency - 100.0).abs() < 1e-9);
        assert_eq!(view.wrappers[0].value, "Cuban");
        assert_eq!(view.flavor_profile[0].count, 1);
        assert_eq!(view.rating, Some(88.0));
        assert_eq!(view.total_recognitions, 1);
        assert_eq!(view.unique_contributors, 2);
        assert_eq!(view.contributors[0].id, "u-1");
    }

    #[test]
    fn view_serializes_in_camel_case() {
        let record = EntityRecord::new(EntityKey::from_parts("a", "b"), Utc::now());
        let json = serde_json::to_value(derive_consensus(&record, &TopNLimits::default())).unwrap();
        assert!(json.get("originConsistency").is_some());
        assert!(json.get("uniqueContributors").is_some());
        assert!(json["rating"].is_null());
    }
}
