use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::VulnerableRelease;
use crate::pep440::VersionKey;

/// Key of the release bucket holding counts that map to no known release.
pub const UNKNOWN: &str = "unknown";

/// How tightly a spec-string constrains its package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecCategory {
    Unpinned,
    Pinned,
    Compatible,
    Range,
    Unknown,
}

impl SpecCategory {
    pub const ALL: [SpecCategory; 5] = [
        SpecCategory::Unpinned,
        SpecCategory::Range,
        SpecCategory::Pinned,
        SpecCategory::Compatible,
        SpecCategory::Unknown,
    ];

    /// Classifies a joined spec-string by its leading operator.
    ///
    /// Only the first constraint decides: `==1.0,<2` is pinned, `<2,==1.0`
    /// is a range.
    pub fn classify(spec: &str) -> Self {
        if spec.is_empty() {
            SpecCategory::Unpinned
        } else if spec.starts_with("==") {
            SpecCategory::Pinned
        } else if spec.starts_with("~=") {
            SpecCategory::Compatible
        } else if ["<", ">", "!="].iter().any(|op| spec.starts_with(op)) {
            SpecCategory::Range
        } else {
            SpecCategory::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecCategory::Unpinned => "unpinned",
            SpecCategory::Pinned => "pinned",
            SpecCategory::Compatible => "compatible",
            SpecCategory::Range => "range",
            SpecCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SpecCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpecCounts {
    pub unpinned: u64,
    pub range: u64,
    pub pinned: u64,
    pub compatible: u64,
    pub unknown: u64,
}

impl SpecCounts {
    pub fn add(&mut self, category: SpecCategory, count: u64) {
        *self.slot(category) += count;
    }

    pub fn get(&self, category: SpecCategory) -> u64 {
        match category {
            SpecCategory::Unpinned => self.unpinned,
            SpecCategory::Pinned => self.pinned,
            SpecCategory::Compatible => self.compatible,
            SpecCategory::Range => self.range,
            SpecCategory::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> u64 {
        SpecCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }

    fn slot(&mut self, category: SpecCategory) -> &mut u64 {
        match category {
            SpecCategory::Unpinned => &mut self.unpinned,
            SpecCategory::Pinned => &mut self.pinned,
            SpecCategory::Compatible => &mut self.compatible,
            SpecCategory::Range => &mut self.range,
            SpecCategory::Unknown => &mut self.unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SecurityCounts {
    pub secure: u64,
    pub insecure: u64,
    pub unknown: u64,
}

/// Ordered key → count buckets. Serializes as a JSON object that keeps the
/// bucket order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally(Vec<(String, u64)>);

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, count: u64) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += count,
            None => self.0.push((key.to_string(), count)),
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, n)| *n)
    }

    /// Orders buckets most-recent-first; keys that are not versions
    /// (such as [`UNKNOWN`]) go last.
    pub fn sort_by_version_desc(&mut self) {
        self.0
            .sort_by_cached_key(|(k, _)| std::cmp::Reverse(VersionKey::new(k)));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, n)| (k.as_str(), *n))
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Statistics for one package across the indexed corpus.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub count: u64,
    pub specs: SpecCounts,
    pub releases: Tally,
    pub major_releases: Tally,
    pub security: SecurityCounts,
    pub vulnerable_releases: Vec<VulnerableRelease>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_examples() {
        assert_eq!(SpecCategory::classify(""), SpecCategory::Unpinned);
        assert_eq!(SpecCategory::classify("==1.0"), SpecCategory::Pinned);
        assert_eq!(SpecCategory::classify("===1.0"), SpecCategory::Pinned);
        assert_eq!(SpecCategory::classify("~=1.0"), SpecCategory::Compatible);
        assert_eq!(SpecCategory::classify(">=1.2"), SpecCategory::Range);
        assert_eq!(SpecCategory::classify("<2,==1.0"), SpecCategory::Range);
        assert_eq!(SpecCategory::classify("!=1.3"), SpecCategory::Range);
        assert_eq!(SpecCategory::classify("1.0"), SpecCategory::Unknown);
    }

    #[test]
    fn test_spec_counts_total() {
        let mut counts = SpecCounts::default();
        counts.add(SpecCategory::Pinned, 3);
        counts.add(SpecCategory::Range, 2);
        counts.add(SpecCategory::Pinned, 1);
        assert_eq!(counts.pinned, 4);
        assert_eq!(counts.total(), 6);
    }

    #[test]
    fn test_tally_accumulates_and_sorts() {
        let mut tally = Tally::new();
        tally.add(UNKNOWN, 0);
        tally.add("1.9", 2);
        tally.add("1.10", 1);
        tally.add("1.9", 3);
        tally.sort_by_version_desc();

        assert_eq!(tally.keys().collect::<Vec<_>>(), vec!["1.10", "1.9", UNKNOWN]);
        assert_eq!(tally.get("1.9"), Some(5));
        assert_eq!(tally.total(), 6);
    }

    #[test]
    fn test_tally_serializes_in_order() {
        let mut tally = Tally::new();
        tally.add("2.0", 1);
        tally.add("10.0", 2);
        tally.add(UNKNOWN, 0);
        let json = serde_json::to_string(&tally).unwrap();
        assert_eq!(json, r#"{"2.0":1,"10.0":2,"unknown":0}"#);
    }
}
