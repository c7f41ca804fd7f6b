//! Comparison keys for entity names.

/// A case-folded projection of an entity name with everything but letters and
/// digits removed. Only used to compare names with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn new(name: &str) -> Self {
        Self(
            name.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Equal to, containing, or contained in `other`.
    pub fn overlaps(&self, other: &NormalizedKey) -> bool {
        self.0 == other.0 || self.0.contains(&other.0) || other.0.contains(&self.0)
    }
}

impl From<&str> for NormalizedKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
