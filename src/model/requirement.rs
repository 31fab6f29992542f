use serde::{Deserialize, Serialize};

use crate::pep440::Specifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Normalized project key (see [`normalize_name`]).
    pub name: String,
    /// Constraints in the order they were written.
    pub specs: Vec<Specifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Environment marker text after `;`, kept verbatim and never evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

impl Requirement {
    pub fn new(name: &str, specs: Vec<Specifier>) -> Self {
        Self {
            name: normalize_name(name),
            specs,
            extras: Vec::new(),
            url: None,
            marker: None,
        }
    }

    pub fn with_extras(mut self, extras: Vec<String>) -> Self {
        self.extras = extras;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn is_unpinned(&self) -> bool {
        self.specs.is_empty()
    }

    /// Index key for this requirement's constraints: `operator+version`
    /// pairs joined by commas in written order. Unpinned requirements map
    /// to the empty string.
    pub fn spec_key(&self) -> String {
        self.specs
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Normalizes a project name into its index key: every run of characters
/// outside `[A-Za-z0-9.]` becomes a single `-`, then the result is lowercased.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            normalized.push(c.to_ascii_lowercase());
            in_run = false;
        } else if !in_run {
            normalized.push('-');
            in_run = true;
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pep440::Operator;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Django"), "django");
        assert_eq!(normalize_name("Foo_Bar"), "foo-bar");
        assert_eq!(normalize_name("foo__-bar"), "foo-bar");
        assert_eq!(normalize_name("zope.interface"), "zope.interface");
    }

    #[test]
    fn test_spec_key_preserves_written_order() {
        let a = Requirement::new(
            "flask",
            vec![
                Specifier::new(Operator::Equal, "1.2"),
                Specifier::new(Operator::LessThan, "2.0"),
            ],
        );
        let b = Requirement::new(
            "flask",
            vec![
                Specifier::new(Operator::LessThan, "2.0"),
                Specifier::new(Operator::Equal, "1.2"),
            ],
        );
        assert_eq!(a.spec_key(), "==1.2,<2.0");
        assert_eq!(b.spec_key(), "<2.0,==1.2");
    }

    #[test]
    fn test_unpinned_spec_key_is_empty() {
        let req = Requirement::new("requests", Vec::new());
        assert!(req.is_unpinned());
        assert_eq!(req.spec_key(), "");
    }
}
