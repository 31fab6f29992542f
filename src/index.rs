//! Package/spec frequency index.
//!
//! The index maps every package seen in the corpus to the spec-strings it
//! was declared with and how often each occurred:
//!
//! ```json
//! {
//!   "django": {
//!     "": 12,
//!     "==1.2": 13,
//!     ">=1.2": 14
//!   }
//! }
//! ```
//!
//! It is built in a single pass over a newline-delimited JSON corpus with
//! [`build_index`] and saved as pretty-printed JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

use crate::model::Requirement;
use crate::parser::read_requirements;

/// Spec-string → occurrence count for one package.
pub type SpecFrequencies = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    packages: BTreeMap<String, SpecFrequencies>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `requirement` under its spec-string.
    pub fn record(&mut self, requirement: &Requirement) {
        *self
            .packages
            .entry(requirement.name.clone())
            .or_default()
            .entry(requirement.spec_key())
            .or_insert(0) += 1;
    }

    /// Records every requirement in raw requirements text and returns how
    /// many were found.
    pub fn add_content(&mut self, content: &str) -> usize {
        let mut found = 0;
        for requirement in read_requirements(content) {
            self.record(&requirement);
            found += 1;
        }
        found
    }

    pub fn package(&self, name: &str) -> Option<&SpecFrequencies> {
        self.packages.get(name)
    }

    /// Total occurrences of `name` across all of its spec-strings.
    pub fn total(&self, name: &str) -> u64 {
        self.package(name)
            .map(|specs| specs.values().sum())
            .unwrap_or(0)
    }

    pub fn packages(&self) -> impl Iterator<Item = (&str, &SpecFrequencies)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Packages ranked by total occurrences, most used first. Ties are
    /// broken by name.
    pub fn popular(&self) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self
            .packages
            .iter()
            .map(|(name, specs)| (name.clone(), specs.values().sum()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read index {}", path.display()))?;
        let index: Index = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse index {}", path.display()))?;
        debug!(packages = index.len(), "loaded index from {}", path.display());
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write index {}", path.display()))?;
        Ok(())
    }
}

/// One corpus record. Fields other than the requirements text are ignored.
#[derive(Deserialize)]
struct CorpusRecord {
    #[serde(rename = "C_content")]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub records: usize,
    pub with_content: usize,
    pub requirements: usize,
}

/// Builds an index from newline-delimited JSON records.
///
/// A record that is not valid JSON aborts the build.
pub fn build_index<R: BufRead>(reader: R) -> Result<(Index, BuildStats)> {
    let mut index = Index::new();
    let mut stats = BuildStats::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read corpus")?;
        if line.trim().is_empty() {
            continue;
        }

        let record: CorpusRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON record on line {}", idx + 1))?;
        stats.records += 1;

        if let Some(content) = record.content {
            stats.with_content += 1;
            stats.requirements += index.add_content(&content);
        }
    }

    info!(
        records = stats.records,
        with_content = stats.with_content,
        requirements = stats.requirements,
        packages = index.len(),
        "index built"
    );

    Ok((index, stats))
}
