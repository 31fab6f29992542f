//! Core data types for requirements, index reports, and advisories.
//!
//! This module contains the fundamental types used throughout reqstats:
//!
//! - [`Requirement`] - One parsed requirement line
//! - [`SpecCategory`] - How tightly a spec-string pins its package
//! - [`PackageReport`] - Statistics derived for a single package
//! - [`Pin`] / [`Vulnerability`] - Advisory lookups for concrete releases
//!
//! # Example
//!
//! ```
//! use reqstats::model::{Requirement, SpecCategory};
//! use reqstats::pep440::{Operator, Specifier};
//!
//! let req = Requirement::new("django", vec![Specifier::new(Operator::GreaterThanEqual, "1.2")]);
//! assert_eq!(req.spec_key(), ">=1.2");
//! assert_eq!(SpecCategory::classify(&req.spec_key()), SpecCategory::Range);
//! ```

mod report;
mod requirement;
mod vulnerability;

pub use report::*;
pub use requirement::*;
pub use vulnerability::*;
