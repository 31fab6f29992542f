//! Per-package statistics from the index.
//!
//! A report is built in four passes over one package's index entry:
//!
//! 1. spec-strings are classified ([`SpecCategory::classify`]) and summed
//! 2. `==` spec-strings are resolved to the highest published release they
//!    admit; everything else lands in the `unknown` release bucket
//! 3. releases are folded into `major.minor` buckets
//! 4. each concrete release is looked up in the advisory database
//!
//! Lookup failures are returned as errors; nothing is retried.

use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::checker::{ReleaseSource, VulnerabilityChecker};
use crate::config::IgnoreConfig;
use crate::index::{Index, SpecFrequencies};
use crate::model::{
    PackageReport, Pin, SecurityCounts, SpecCategory, SpecCounts, Tally, VulnerableRelease,
    UNKNOWN,
};
use crate::pep440::{SpecifierSet, Version};

pub struct PackageAnalyzer<'a> {
    releases: &'a dyn ReleaseSource,
    checker: Option<&'a dyn VulnerabilityChecker>,
    ignore: IgnoreConfig,
}

impl<'a> PackageAnalyzer<'a> {
    pub fn new(releases: &'a dyn ReleaseSource) -> Self {
        Self {
            releases,
            checker: None,
            ignore: IgnoreConfig::default(),
        }
    }

    /// Enables advisory lookups. Without a checker every release counts as
    /// security-unknown.
    pub fn with_checker(mut self, checker: &'a dyn VulnerabilityChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn with_ignore(mut self, ignore: IgnoreConfig) -> Self {
        self.ignore = ignore;
        self
    }

    pub async fn analyze(&self, index: &Index, name: &str) -> Result<PackageReport> {
        let empty = SpecFrequencies::new();
        let entry = index.package(name).unwrap_or(&empty);

        let specs = count_categories(entry);

        let published = self.releases.releases(name).await?;
        debug!(
            package = name,
            source = self.releases.name(),
            releases = published.len(),
            "fetched releases"
        );

        let releases = resolve_releases(entry, &published);
        let major_releases = major_releases(&releases);

        let (security, vulnerable_releases) = match self.checker {
            Some(checker) => self.check_security(checker, name, &releases).await?,
            None => (
                SecurityCounts {
                    unknown: releases.total(),
                    ..SecurityCounts::default()
                },
                Vec::new(),
            ),
        };

        let report = PackageReport {
            name: name.to_string(),
            generated_at: Utc::now(),
            count: entry.values().sum(),
            specs,
            releases,
            major_releases,
            security,
            vulnerable_releases,
        };

        info!(
            package = name,
            count = report.count,
            insecure = report.security.insecure,
            "package analyzed"
        );

        Ok(report)
    }

    async fn check_security(
        &self,
        checker: &dyn VulnerabilityChecker,
        name: &str,
        releases: &Tally,
    ) -> Result<(SecurityCounts, Vec<VulnerableRelease>)> {
        let pins: Vec<Pin> = releases
            .keys()
            .filter(|version| *version != UNKNOWN)
            .map(|version| Pin::new(name, version))
            .collect();

        let mut advisories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for vuln in checker.check(&pins).await? {
            if self.ignore.should_ignore_vulnerability(&vuln.id) {
                debug!(id = %vuln.id, "ignoring advisory");
                continue;
            }
            let ids = advisories.entry(vuln.version).or_default();
            if !ids.contains(&vuln.id) {
                ids.push(vuln.id);
            }
        }

        let mut security = SecurityCounts::default();
        let mut vulnerable = Vec::new();
        for (version, count) in releases.iter() {
            if version == UNKNOWN {
                security.unknown = count;
                continue;
            }
            match advisories.remove(version) {
                Some(ids) if !ids.is_empty() => {
                    security.insecure += count;
                    vulnerable.push(VulnerableRelease {
                        version: version.to_string(),
                        count,
                        advisories: ids,
                    });
                }
                _ => security.secure += count,
            }
        }

        Ok((security, vulnerable))
    }
}

/// Sums an index entry by spec category.
pub fn count_categories(entry: &SpecFrequencies) -> SpecCounts {
    let mut counts = SpecCounts::default();
    for (spec, count) in entry {
        counts.add(SpecCategory::classify(spec), *count);
    }
    counts
}

/// Maps every `==` spec-string to the highest release it admits
/// (pre-releases included). Counts that resolve to nothing go to
/// [`UNKNOWN`], which is always present. Buckets come back newest first.
pub fn resolve_releases(entry: &SpecFrequencies, published: &[String]) -> Tally {
    let candidates: Vec<(&str, Version)> = published
        .iter()
        .filter_map(|raw| Version::parse(raw).ok().map(|v| (raw.as_str(), v)))
        .collect();

    let mut releases = Tally::new();
    releases.add(UNKNOWN, 0);

    for (spec, count) in entry {
        let resolved = if spec.starts_with("==") {
            highest_match(spec, &candidates)
        } else {
            None
        };
        releases.add(resolved.unwrap_or(UNKNOWN), *count);
    }

    releases.sort_by_version_desc();
    releases
}

fn highest_match<'r>(spec: &str, candidates: &[(&'r str, Version)]) -> Option<&'r str> {
    let set = match SpecifierSet::parse(spec) {
        Ok(set) => set,
        Err(e) => {
            debug!(spec, "unresolvable spec: {}", e);
            return None;
        }
    };

    candidates
        .iter()
        .filter(|(raw, version)| set.contains(version, raw))
        .max_by(|a, b| a.1.cmp(&b.1))
        .map(|(raw, _)| *raw)
}

/// The first two dot-separated components of a version string.
pub fn major_release(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Folds release buckets into major-release buckets, newest first.
pub fn major_releases(releases: &Tally) -> Tally {
    let mut majors = Tally::new();
    for (version, count) in releases.iter() {
        majors.add(&major_release(version), count);
    }
    majors.sort_by_version_desc();
    majors
}
