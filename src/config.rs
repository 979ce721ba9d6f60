//! Engine configuration.
//!
//! Every knob has a default that matches the behavior callers expect out of
//! the box, so `EngineConfig::default()` is the normal starting point.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::field::{ArrayField, ScalarField};

/// Length limits for the ranked lists in a consensus view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopNLimits {
    /// Wrapper ranking length.
    pub wrappers: usize,
    /// Binder ranking length.
    pub binders: usize,
    /// Filler ranking length.
    pub fillers: usize,
    /// Flavor profile ranking length.
    pub flavor_profile: usize,
    /// Tasting-note ranking length (foot, body and head).
    pub taste_notes: usize,
}

impl Default for TopNLimits {
    fn default() -> Self {
        Self {
            wrappers: 5,
            binders: 5,
            fillers: 5,
            flavor_profile: 10,
            taste_notes: 5,
        }
    }
}

impl TopNLimits {
    /// Limit applied to a ranked scalar field.
    ///
    /// Fields that are reported as a single top value rank only one entry.
    #[must_use]
    pub const fn for_scalar(&self, field: ScalarField) -> usize {
        match field {
            ScalarField::Wrapper => self.wrappers,
            ScalarField::Binder => self.binders,
            ScalarField::Filler => self.fillers,
            ScalarField::Brand
            | ScalarField::Name
            | ScalarField::Origin
            | ScalarField::Strength => 1,
        }
    }

    /// Limit applied to an array field.
    #[must_use]
    pub const fn for_array(&self, field: ArrayField) -> usize {
        match field {
            ArrayField::FlavorProfile => self.flavor_profile,
            ArrayField::FootTasteNotes | ArrayField::BodyTasteNotes | ArrayField::HeadTasteNotes => {
                self.taste_notes
            }
        }
    }
}

/// Inclusive range a rating must fall in to be counted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingBounds {
    /// Smallest accepted rating.
    pub min: f64,
    /// Largest accepted rating.
    pub max: f64,
}

impl Default for RatingBounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
        }
    }
}

impl RatingBounds {
    /// Returns true if `rating` is finite and inside the bounds.
    #[must_use]
    pub fn contains(&self, rating: f64) -> bool {
        rating.is_finite() && rating >= self.min && rating <= self.max
    }
}

/// Configuration for [`crate::ConsensusEngine`].
///
/// # Examples
///
/// ```
/// use kyro_tally::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "rating": { "max": 5.0 } }"#).unwrap();
/// assert_eq!(config.rating.max, 5.0);
/// assert_eq!(config.limits.flavor_profile, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ranked-list lengths.
    pub limits: TopNLimits,
    /// Accepted rating range.
    pub rating: RatingBounds,
}

impl EngineConfig {
    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if the rating bounds are not
    /// finite or `min > max`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let RatingBounds { min, max } = self.rating;
        if !min.is_finite() || !max.is_finite() {
            return Err(ValidationError::InvalidConfig {
                reason: format!("rating bounds must be finite (min={min}, max={max})"),
            });
        }
        if min > max {
            return Err(ValidationError::InvalidConfig {
                reason: format!("rating min {min} exceeds max {max}"),
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration; omitted keys keep defaults.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` on malformed JSON or invalid
    /// values.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
