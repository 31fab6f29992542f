use serde::{Deserialize, Serialize};

/// A concrete `name==version` to look up in an advisory database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    pub version: String,
}

impl Pin {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// An advisory matching a [`Pin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub package: String,
    pub version: String,
}

/// Releases with at least one advisory, as listed in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerableRelease {
    pub version: String,
    pub count: u64,
    pub advisories: Vec<String>,
}
