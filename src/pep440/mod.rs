//! PEP 440 version parsing, ordering, and specifier matching.
//!
//! Only what release resolution needs: versions sort the way PyPI tooling
//! sorts them, and a [`SpecifierSet`] can tell whether a release satisfies a
//! constraint string such as `==1.2.*` or `>=1.0,<2.0`. Pre-releases are
//! always admitted.
//!
//! # Example
//!
//! ```
//! use reqstats::pep440::{SpecifierSet, Version};
//!
//! let spec = SpecifierSet::parse("==1.4.*").unwrap();
//! assert!(spec.contains_str("1.4.2"));
//! assert!(Version::parse("1.0rc1").unwrap() < Version::parse("1.0").unwrap());
//! ```

mod specifier;
mod version;

pub use specifier::{Operator, Specifier, SpecifierSet};
pub use version::{sort_descending, LocalSegment, PreKind, Version, VersionKey};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Pep440Error {
    #[error("invalid version: {0:?}")]
    InvalidVersion(String),

    #[error("invalid specifier: {0:?}")]
    InvalidSpecifier(String),
}
