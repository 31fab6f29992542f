use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::Pep440Error;
use crate::cursor::Cursor;

/// Pre-release phase. Declaration order is the PEP 440 ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreKind {
    Alpha,
    Beta,
    Rc,
}

impl PreKind {
    fn as_str(&self) -> &'static str {
        match self {
            PreKind::Alpha => "a",
            PreKind::Beta => "b",
            PreKind::Rc => "rc",
        }
    }
}

/// One dot-separated piece of a local version label (`+ubuntu.1`).
///
/// Alphanumeric segments sort below numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocalSegment {
    Text(String),
    Number(u64),
}

/// A parsed PEP 440 version.
///
/// Equality and ordering follow PEP 440, so `1.0 == 1.0.0` and
/// `1.0.dev0 < 1.0a1 < 1.0 < 1.0.post1`.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self, Pep440Error> {
        let normalized = input.trim().to_ascii_lowercase();
        let invalid = || Pep440Error::InvalidVersion(input.to_string());

        let mut cursor = Cursor::new(&normalized);
        cursor.eat('v');

        let first = cursor.digits().ok_or_else(invalid)?;
        let (epoch, first) = if cursor.eat('!') {
            (first, cursor.digits().ok_or_else(invalid)?)
        } else {
            (0, first)
        };

        let mut release = vec![first];
        while cursor.peek() == Some('.') && cursor.peek_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            cursor.bump();
            release.push(cursor.digits().ok_or_else(invalid)?);
        }

        let pre = cursor.attempt(|c| {
            separator(c);
            let kind = c.keyword(&[
                ("alpha", PreKind::Alpha),
                ("a", PreKind::Alpha),
                ("beta", PreKind::Beta),
                ("b", PreKind::Beta),
                ("preview", PreKind::Rc),
                ("pre", PreKind::Rc),
                ("rc", PreKind::Rc),
                ("c", PreKind::Rc),
            ])?;
            separator(c);
            Some((kind, c.digits().unwrap_or(0)))
        });

        let post = cursor
            .attempt(|c| {
                // implicit post release: `1.0-1`
                if !c.eat('-') {
                    return None;
                }
                c.digits()
            })
            .or_else(|| {
                cursor.attempt(|c| {
                    separator(c);
                    c.keyword(&[("post", ()), ("rev", ()), ("r", ())])?;
                    separator(c);
                    Some(c.digits().unwrap_or(0))
                })
            });

        let dev = cursor.attempt(|c| {
            separator(c);
            c.keyword(&[("dev", ())])?;
            separator(c);
            Some(c.digits().unwrap_or(0))
        });

        let mut local = Vec::new();
        if cursor.eat('+') {
            let label = cursor.rest();
            for segment in label.split(['.', '-', '_']) {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_alphanumeric()) {
                    return Err(invalid());
                }
                local.push(match segment.parse::<u64>() {
                    Ok(n) => LocalSegment::Number(n),
                    Err(_) => LocalSegment::Text(segment.to_string()),
                });
            }
            cursor.finish();
        }

        if !cursor.is_done() {
            return Err(invalid());
        }

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre(&self) -> Option<(PreKind, u64)> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    pub fn local(&self) -> &[LocalSegment] {
        &self.local
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn has_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// The version without its local label.
    pub fn public(&self) -> Version {
        Version {
            local: Vec::new(),
            ..self.clone()
        }
    }

    /// Epoch and release segments only.
    pub fn base(&self) -> Version {
        Version {
            epoch: self.epoch,
            release: self.release.clone(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    fn sort_key(&self) -> SortKey<'_> {
        let mut release = self.release.as_slice();
        while let [rest @ .., 0] = release {
            release = rest;
        }

        let pre = match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (None, _, _) => PreKey::Final,
            (Some((kind, n)), _, _) => PreKey::Pre(kind, n),
        };
        let dev = match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Release,
        };
        let local = if self.local.is_empty() {
            None
        } else {
            Some(self.local.as_slice())
        };

        SortKey {
            epoch: self.epoch,
            release,
            pre,
            post: self.post,
            dev,
            local,
        }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    Release,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct SortKey<'a> {
    epoch: u64,
    release: &'a [u64],
    pre: PreKey,
    post: Option<u64>,
    dev: DevKey,
    local: Option<&'a [LocalSegment]>,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl FromStr for Version {
    type Err = Pep440Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{}", kind.as_str(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        if !self.local.is_empty() {
            let local: Vec<String> = self
                .local
                .iter()
                .map(|s| match s {
                    LocalSegment::Text(t) => t.clone(),
                    LocalSegment::Number(n) => n.to_string(),
                })
                .collect();
            write!(f, "+{}", local.join("."))?;
        }
        Ok(())
    }
}

/// Ordering key for arbitrary release strings.
///
/// Strings that are not valid PEP 440 versions (including the `unknown`
/// bucket) sort below every valid version, then by their text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum VersionKey {
    Legacy(String),
    Valid(Version),
}

impl VersionKey {
    pub fn new(s: &str) -> Self {
        match Version::parse(s) {
            Ok(v) => VersionKey::Valid(v),
            Err(_) => VersionKey::Legacy(s.to_string()),
        }
    }
}

/// Sorts version strings most-recent-first.
pub fn sort_descending(versions: &mut [String]) {
    versions.sort_by_cached_key(|v| std::cmp::Reverse(VersionKey::new(v)));
}

fn separator(cursor: &mut Cursor) {
    cursor.eat_any(&['.', '-', '_']);
}
