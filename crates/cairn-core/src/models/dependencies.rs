//! The `depends_on` payload of a step.

use serde::{Deserialize, Serialize};

/// Dependencies of a step as read back from storage.
///
/// The store keeps `depends_on` as JSON text. A payload that does not parse
/// as a list of ids is kept as [`Dependencies::Malformed`] rather than
/// failing the whole plan load; engine code treats it as "no dependencies"
/// and logs the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependencies {
    /// Sibling step ids this step waits for
    Parsed(Vec<String>),
    /// Raw payload that could not be parsed
    Malformed(String),
}

impl Default for Dependencies {
    fn default() -> Self {
        Dependencies::Parsed(Vec::new())
    }
}

impl From<Vec<String>> for Dependencies {
    fn from(ids: Vec<String>) -> Self {
        Dependencies::Parsed(ids)
    }
}

impl Dependencies {
    /// Parses the stored JSON text.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(ids) => Dependencies::Parsed(ids),
            Err(_) => Dependencies::Malformed(raw.to_string()),
        }
    }

    /// Dependency ids; empty for a malformed payload.
    pub fn ids(&self) -> &[String] {
        match self {
            Dependencies::Parsed(ids) => ids,
            Dependencies::Malformed(_) => &[],
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Dependencies::Malformed(_))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids().iter().any(|dep| dep == id)
    }

    /// JSON text written to the store.
    pub fn to_stored(&self) -> String {
        match self {
            Dependencies::Parsed(ids) => {
                serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
            }
            Dependencies::Malformed(raw) => raw.clone(),
        }
    }
}
