//! Recognition samples.
//!
//! A sample is one caller-supplied, possibly incomplete observation about an
//! entity. Samples are never stored as-is: ingestion folds them into the
//! entity record and drops them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ValidationError;
use crate::field::{ArrayField, ScalarField};
use crate::key::EntityKey;

/// One recognition observation.
///
/// Only `brand` and `name` are required; every other attribute is optional
/// and skipped when absent.
///
/// # Examples
///
/// ```
/// use kyro_tally::{Sample, ScalarField};
///
/// let sample = Sample::new("Cohiba", "Siglo II")
///     .with_scalar(ScalarField::Origin, "Cuba")
///     .with_rating(85.0);
/// assert!(sample.validate().is_ok());
/// assert_eq!(sample.scalar(ScalarField::Origin), Some("Cuba"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Sample {
    /// Manufacturer brand (required).
    pub brand: String,
    /// Product name (required).
    pub name: String,
    /// Country or region of origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Strength classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    /// Wrapper leaf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,
    /// Binder leaf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binder: Option<String>,
    /// Filler blend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filler: Option<String>,
    /// Numeric rating; must fall inside the engine's configured bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Recognizer confidence in the description, 0.0 to 1.0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Overall flavor descriptors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flavor_profile: Vec<String>,
    /// First-third tasting notes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub foot_taste_notes: Vec<String>,
    /// Second-third tasting notes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body_taste_notes: Vec<String>,
    /// Final-third tasting notes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub head_taste_notes: Vec<String>,
    /// Stable identifier of the submitter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor_id: Option<String>,
    /// Display name of the submitter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor_name: Option<String>,
}

impl Sample {
    /// Creates a sample carrying only the required fields.
    #[must_use]
    pub fn new(brand: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets a scalar attribute.
    #[must_use]
    pub fn with_scalar(mut self, field: ScalarField, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            ScalarField::Brand => self.brand = value,
            ScalarField::Name => self.name = value,
            ScalarField::Origin => self.origin = Some(value),
            ScalarField::Strength => self.strength = Some(value),
            ScalarField::Wrapper => self.wrapper = Some(value),
            ScalarField::Binder => self.binder = Some(value),
            ScalarField::Filler => self.filler = Some(value),
        }
        self
    }

    /// Appends values to an array attribute.
    #[must_use]
    pub fn with_values<I, S>(mut self, field: ArrayField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.array_mut(field).extend(values.into_iter().map(Into::into));
        self
    }

    /// Sets the rating.
    #[must_use]
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Sets the description and the confidence backing it.
    #[must_use]
    pub fn with_description(mut self, text: impl Into<String>, confidence: f64) -> Self {
        self.description = Some(text.into());
        self.confidence = Some(confidence);
        self
    }

    /// Sets the submitting contributor.
    #[must_use]
    pub fn with_contributor(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.contributor_id = Some(id.into());
        self.contributor_name = Some(name.into());
        self
    }

    /// Returns the raw value of a scalar attribute, if supplied.
    #[must_use]
    pub fn scalar(&self, field: ScalarField) -> Option<&str> {
        match field {
            ScalarField::Brand => Some(self.brand.as_str()),
            ScalarField::Name => Some(self.name.as_str()),
            ScalarField::Origin => self.origin.as_deref(),
            ScalarField::Strength => self.strength.as_deref(),
            ScalarField::Wrapper => self.wrapper.as_deref(),
            ScalarField::Binder => self.binder.as_deref(),
            ScalarField::Filler => self.filler.as_deref(),
        }
    }

    /// Returns the raw values of an array attribute.
    #[must_use]
    pub fn array(&self, field: ArrayField) -> &[String] {
        match field {
            ArrayField::FlavorProfile => &self.flavor_profile,
            ArrayField::FootTasteNotes => &self.foot_taste_notes,
            ArrayField::BodyTasteNotes => &self.body_taste_notes,
            ArrayField::HeadTasteNotes => &self.head_taste_notes,
        }
    }

    fn array_mut(&mut self, field: ArrayField) -> &mut Vec<String> {
        match field {
            ArrayField::FlavorProfile => &mut self.flavor_profile,
            ArrayField::FootTasteNotes => &mut self.foot_taste_notes,
            ArrayField::BodyTasteNotes => &mut self.body_taste_notes,
            ArrayField::HeadTasteNotes => &mut self.head_taste_notes,
        }
    }

    /// Checks the required fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` if `brand` or `name` is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.brand.trim().is_empty() {
            return Err(ValidationError::missing("brand"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::missing("name"));
        }
        Ok(())
    }

    /// Derives the record key for this sample.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey::from_parts(&self.brand, &self.name)
    }

    /// Parses a sample leniently from loosely-typed JSON.
    ///
    /// Optional fields of the wrong type are dropped and reported instead of
    /// failing the whole sample; a single bad element of an array field drops
    /// only that element.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the payload is not an object or if
    /// `brand` or `name` is missing, blank, or not a string.
    pub fn from_json(value: &Value) -> Result<ParsedSample, ValidationError> {
        let Value::Object(obj) = value else {
            return Err(ValidationError::NotAnObject {
                found: json_type(value).to_string(),
            });
        };

        let mut malformed = Vec::new();
        let brand = required_string(obj, "brand")?;
        let name = required_string(obj, "name")?;
        let mut sample = Self::new(brand, name);

        for field in ScalarField::ALL {
            if matches!(field, ScalarField::Brand | ScalarField::Name) {
                continue;
            }
            if let Some(value) = optional_string(obj, field.as_str(), &mut malformed) {
                sample = sample.with_scalar(field, value);
            }
        }
        for field in ArrayField::ALL {
            let values = string_array(obj, field.as_str(), &mut malformed);
            sample = sample.with_values(field, values);
        }

        sample.rating = optional_number(obj, "rating", &mut malformed);
        sample.confidence = optional_number(obj, "confidence", &mut malformed);
        sample.description = optional_string(obj, "description", &mut malformed);
        sample.contributor_id = optional_string(obj, "contributorId", &mut malformed);
        sample.contributor_name = optional_string(obj, "contributorName", &mut malformed);

        Ok(ParsedSample { sample, malformed })
    }
}

/// Output of [`Sample::from_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSample {
    /// The sample built from the well-formed fields.
    pub sample: Sample,
    /// Fields that were dropped while parsing.
    pub malformed: Vec<MalformedField>,
}

/// An optional field that was skipped while the rest of the sample merged.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Field '{field}' skipped: {reason}")]
pub struct MalformedField {
    /// Wire name of the field, with an index suffix for array elements.
    pub field: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl MalformedField {
    /// Creates a malformed-field report.
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn wrong_type(field: impl Into<String>, expected: &str, found: &Value) -> Self {
        Self::new(field, format!("expected {expected}, got {}", json_type(found)))
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required_string(obj: &Map<String, Value>, key: &str) -> Result<String, ValidationError> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(ValidationError::missing(key)),
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    key: &str,
    malformed: &mut Vec<MalformedField>,
) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => {
            malformed.push(MalformedField::wrong_type(key, "string", other));
            None
        }
    }
}

fn optional_number(
    obj: &Map<String, Value>,
    key: &str,
    malformed: &mut Vec<MalformedField>,
) -> Option<f64> {
    match obj.get(key)? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        other => {
            malformed.push(MalformedField::wrong_type(key, "number", other));
            None
        }
    }
}

fn string_array(
    obj: &Map<String, Value>,
    key: &str,
    malformed: &mut Vec<MalformedField>,
) -> Vec<String> {
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| match item {
                Value::String(s) => Some(s.clone()),
                other => {
                    malformed.push(MalformedField::wrong_type(
                        format!("{key}[{idx}]"),
                        "string",
                        other,
                    ));
                    None
                }
            })
            .collect(),
        Some(other) => {
            malformed.push(MalformedField::wrong_type(key, "array", other));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn validate_rejects_blank_required_fields() {
        let err = Sample::new("", "Siglo II").validate().unwrap_err();
        assert_eq!(err, ValidationError::missing("brand"));

        let err = Sample::new("Cohiba", "   ").validate().unwrap_err();
        assert_eq!(err, ValidationError::missing("name"));

        assert!(Sample::new("Cohiba", "Siglo II").validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let sample = Sample::new("Cohiba", "Siglo II")
            .with_scalar(ScalarField::Wrapper, "Cuban")
            .with_values(ArrayField::FlavorProfile, ["cedar", "leather"])
            .with_description("Creamy and balanced", 0.8)
            .with_contributor("u-1", "Ana");

        assert_eq!(sample.scalar(ScalarField::Wrapper), Some("Cuban"));
        assert_eq!(sample.scalar(ScalarField::Origin), None);
        assert_eq!(sample.array(ArrayField::FlavorProfile), ["cedar", "leather"]);
        assert_eq!(sample.confidence, Some(0.8));
        assert_eq!(sample.contributor_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn serde_uses_camel_case() {
        let sample = Sample::new("Cohiba", "Siglo II")
            .with_values(ArrayField::FootTasteNotes, ["pepper"])
            .with_contributor("u-1", "Ana");
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["footTasteNotes"], json!(["pepper"]));
        assert_eq!(value["contributorId"], json!("u-1"));
        assert!(value.get("origin").is_none());

        let back: Sample = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn from_json_requires_brand_and_name() {
        let err = Sample::from_json(&json!({ "name": "Siglo II" })).unwrap_err();
        assert_eq!(err, ValidationError::missing("brand"));

        let err = Sample::from_json(&json!({ "brand": "Cohiba", "name": 12 })).unwrap_err();
        assert_eq!(err, ValidationError::missing("name"));

        let err = Sample::from_json(&json!(["Cohiba"])).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject { .. }));
    }

    #[test]
    fn from_json_skips_malformed_fields_individually() {
        let parsed = Sample::from_json(&json!({
            "brand": "Cohiba",
            "name": "Siglo II",
            "origin": "Cuba",
            "strength": 3,
            "rating": "ninety",
            "confidence": 0.7,
            "flavorProfile": ["cedar", 7, "cocoa", null],
            "headTasteNotes": "spice",
            "contributorId": "u-1",
        }))
        .unwrap();

        let sample = parsed.sample;
        assert_eq!(sample.origin.as_deref(), Some("Cuba"));
        assert_eq!(sample.strength, None);
        assert_eq!(sample.rating, None);
        assert_eq!(sample.confidence, Some(0.7));
        assert_eq!(sample.flavor_profile, ["cedar", "cocoa"]);
        assert!(sample.head_taste_notes.is_empty());
        assert_eq!(sample.contributor_id.as_deref(), Some("u-1"));

        let fields: Vec<&str> = parsed.malformed.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(
            fields,
            ["strength", "flavorProfile[1]", "flavorProfile[3]", "headTasteNotes", "rating"]
        );
        assert!(parsed.malformed[0].reason.contains("got number"));
    }

    #[test]
    fn from_json_treats_null_as_absent() {
        let parsed = Sample::from_json(&json!({
            "brand": "Cohiba",
            "name": "Siglo II",
            "rating": null,
            "origin": null,
            "bodyTasteNotes": null,
        }))
        .unwrap();
        assert!(parsed.malformed.is_empty());
        assert_eq!(parsed.sample, Sample::new("Cohiba", "Siglo II"));
    }
}
