//! Entity keys.
//!
//! Every sample is routed to its record through a key derived from the raw
//! brand and name text. Recognition output varies in case, spacing and
//! punctuation ("Siglo II", "siglo-ii", "SIGLO  II"), so the key keeps only
//! lowercase alphanumerics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of an entity record.
///
/// # Examples
///
/// ```
/// use kyro_tally::EntityKey;
///
/// let a = EntityKey::from_parts("Cohiba", "Siglo II");
/// let b = EntityKey::from_parts(" COHIBA ", "siglo-ii");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "cohibasigloii");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Derives the key for a brand and name pair.
    ///
    /// Total: empty or punctuation-only input yields an empty key, which
    /// callers must reject themselves.
    #[must_use]
    pub fn from_parts(brand: &str, name: &str) -> Self {
        Self(normalize_key(brand, name))
    }

    /// Wraps an already-normalized key, e.g. one read back from a view.
    #[must_use]
    pub fn from_normalized(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if normalization left nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercases and concatenates brand and name, dropping every character
/// that is not alphanumeric.
#[must_use]
pub fn normalize_key(brand: &str, name: &str) -> String {
    brand
        .chars()
        .chain(name.chars())
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
