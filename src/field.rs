//! Attribute catalog.
//!
//! Samples carry two kinds of categorical attributes: single-valued scalars
//! (one value per sample) and multi-valued arrays (any number of values per
//! sample). Both are tallied as value→count maps on the record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Single-valued categorical attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarField {
    /// Manufacturer brand.
    Brand,
    /// Product line or vitola name, as spelled by the sample.
    Name,
    /// Country or region of origin.
    Origin,
    /// Strength classification.
    Strength,
    /// Wrapper leaf.
    Wrapper,
    /// Binder leaf.
    Binder,
    /// Filler blend.
    Filler,
}

impl ScalarField {
    /// Every scalar field, in record order.
    pub const ALL: [Self; 7] = [
        Self::Brand,
        Self::Name,
        Self::Origin,
        Self::Strength,
        Self::Wrapper,
        Self::Binder,
        Self::Filler,
    ];

    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Name => "name",
            Self::Origin => "origin",
            Self::Strength => "strength",
            Self::Wrapper => "wrapper",
            Self::Binder => "binder",
            Self::Filler => "filler",
        }
    }
}

impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-valued categorical attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayField {
    /// Overall flavor descriptors.
    FlavorProfile,
    /// Tasting notes for the first third.
    FootTasteNotes,
    /// Tasting notes for the second third.
    BodyTasteNotes,
    /// Tasting notes for the final third.
    HeadTasteNotes,
}

impl ArrayField {
    /// Every array field, in record order.
    pub const ALL: [Self; 4] = [
        Self::FlavorProfile,
        Self::FootTasteNotes,
        Self::BodyTasteNotes,
        Self::HeadTasteNotes,
    ];

    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FlavorProfile => "flavorProfile",
            Self::FootTasteNotes => "footTasteNotes",
            Self::BodyTasteNotes => "bodyTasteNotes",
            Self::HeadTasteNotes => "headTasteNotes",
        }
    }
}

impl fmt::Display for ArrayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for field in ScalarField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
        for field in ArrayField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }
}
