use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Pep440Error, Version};

/// Comparison operator of a version specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<=")]
    LessThanEqual,
    #[serde(rename = ">=")]
    GreaterThanEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "~=")]
    Compatible,
    #[serde(rename = "===")]
    ArbitraryEqual,
}

impl Operator {
    /// Longest spellings first so prefix matching picks `===` over `==`.
    const ALL: [Operator; 8] = [
        Operator::ArbitraryEqual,
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessThanEqual,
        Operator::GreaterThanEqual,
        Operator::Compatible,
        Operator::LessThan,
        Operator::GreaterThan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessThanEqual => "<=",
            Operator::GreaterThanEqual => ">=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::Compatible => "~=",
            Operator::ArbitraryEqual => "===",
        }
    }

    /// Splits a leading operator off `input`.
    pub fn strip_prefix(input: &str) -> Option<(Operator, &str)> {
        Self::ALL
            .iter()
            .find_map(|op| input.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
    }

    /// Whether a trailing `.*` is allowed on the version.
    pub fn allows_wildcard(&self) -> bool {
        matches!(self, Operator::Equal | Operator::NotEqual)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator and the version text exactly as written in a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Specifier {
    pub operator: Operator,
    pub version: String,
}

impl Specifier {
    pub fn new(operator: Operator, version: impl Into<String>) -> Self {
        Self {
            operator,
            version: version.into(),
        }
    }

    /// Checks that the version is usable with the operator, by the same
    /// rules [`SpecifierSet::parse`] applies.
    pub fn validate(&self) -> Result<(), Pep440Error> {
        Clause::parse(&self.to_string()).map(|_| ())
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

#[derive(Debug, Clone)]
enum Target {
    Exact(Version),
    Prefix(Version),
    Text(String),
}

#[derive(Debug, Clone)]
struct Clause {
    operator: Operator,
    target: Target,
}

impl Clause {
    fn parse(input: &str) -> Result<Self, Pep440Error> {
        let invalid = || Pep440Error::InvalidSpecifier(input.to_string());
        let (operator, version) = Operator::strip_prefix(input).ok_or_else(invalid)?;
        let version = version.trim();
        if version.is_empty() {
            return Err(invalid());
        }

        let target = match operator {
            Operator::ArbitraryEqual => Target::Text(version.to_ascii_lowercase()),
            _ => match version.strip_suffix(".*") {
                Some(prefix) if operator.allows_wildcard() => {
                    let prefix = Version::parse(prefix).map_err(|_| invalid())?;
                    if prefix.has_local() {
                        return Err(invalid());
                    }
                    Target::Prefix(prefix)
                }
                Some(_) => return Err(invalid()),
                None => {
                    let exact = Version::parse(version).map_err(|_| invalid())?;
                    let local_allowed = matches!(
                        operator,
                        Operator::Equal | Operator::NotEqual | Operator::ArbitraryEqual
                    );
                    if exact.has_local() && !local_allowed {
                        return Err(invalid());
                    }
                    if operator == Operator::Compatible && exact.release().len() < 2 {
                        return Err(invalid());
                    }
                    Target::Exact(exact)
                }
            },
        };

        Ok(Self { operator, target })
    }

    /// Pre-releases are always admitted.
    fn contains(&self, candidate: &Version, raw: &str) -> bool {
        match (&self.target, self.operator) {
            (Target::Text(text), _) => raw.trim().to_ascii_lowercase() == *text,
            (Target::Prefix(prefix), Operator::Equal) => prefix_matches(prefix, candidate),
            (Target::Prefix(prefix), Operator::NotEqual) => !prefix_matches(prefix, candidate),
            (Target::Prefix(_), _) => false,
            (Target::Exact(spec), op) => match op {
                Operator::Equal => exact_matches(spec, candidate),
                Operator::NotEqual => !exact_matches(spec, candidate),
                Operator::LessThanEqual => candidate.public() <= *spec,
                Operator::GreaterThanEqual => candidate.public() >= *spec,
                Operator::LessThan => {
                    candidate < spec
                        && !(!spec.is_prerelease()
                            && candidate.is_prerelease()
                            && candidate.base() == spec.base())
                }
                Operator::GreaterThan => {
                    candidate > spec
                        && !(!spec.is_postrelease()
                            && candidate.is_postrelease()
                            && candidate.base() == spec.base())
                        && !(candidate.has_local() && candidate.base() == spec.base())
                }
                Operator::Compatible => {
                    let release = spec.release();
                    let prefix = Version::parse(&compatible_prefix(spec.epoch(), release));
                    candidate >= spec
                        && prefix.is_ok_and(|prefix| prefix_matches(&prefix, candidate))
                }
                Operator::ArbitraryEqual => raw.trim().eq_ignore_ascii_case(&spec.to_string()),
            },
        }
    }
}

fn exact_matches(spec: &Version, candidate: &Version) -> bool {
    if spec.has_local() {
        candidate == spec
    } else {
        candidate.public() == *spec
    }
}

fn prefix_matches(prefix: &Version, candidate: &Version) -> bool {
    if prefix.epoch() != candidate.epoch() {
        return false;
    }
    let wanted = prefix.release();
    let mut release = candidate.release().to_vec();
    if release.len() < wanted.len() {
        release.resize(wanted.len(), 0);
    }
    if release[..wanted.len()] != *wanted {
        return false;
    }
    let has_suffix = prefix.pre().is_some() || prefix.post().is_some() || prefix.dev().is_some();
    if !has_suffix {
        return true;
    }
    release.len() == wanted.len()
        && prefix.pre() == candidate.pre()
        && prefix.post() == candidate.post()
        && prefix.dev().is_none_or(|dev| candidate.dev() == Some(dev))
}

fn compatible_prefix(epoch: u64, release: &[u64]) -> String {
    let kept: Vec<String> = release[..release.len() - 1]
        .iter()
        .map(|n| n.to_string())
        .collect();
    if epoch == 0 {
        kept.join(".")
    } else {
        format!("{}!{}", epoch, kept.join("."))
    }
}

/// A comma-separated conjunction of specifiers, e.g. `==1.2,<2.0`.
#[derive(Debug, Clone, Default)]
pub struct SpecifierSet {
    clauses: Vec<Clause>,
}

impl SpecifierSet {
    pub fn parse(input: &str) -> Result<Self, Pep440Error> {
        let clauses = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Clause::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { clauses })
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether `candidate` satisfies every clause; `raw` is the candidate's
    /// original spelling, used by `===`.
    pub fn contains(&self, candidate: &Version, raw: &str) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.contains(candidate, raw))
    }

    /// Like [`contains`](Self::contains) for an unparsed version string.
    /// Strings that are not PEP 440 versions never match.
    pub fn contains_str(&self, candidate: &str) -> bool {
        Version::parse(candidate).is_ok_and(|version| self.contains(&version, candidate))
    }
}
