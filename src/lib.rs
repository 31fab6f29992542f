pub mod analyzer;
pub mod cache;
pub mod checker;
pub mod config;
mod cursor;
pub mod index;
pub mod logging;
pub mod model;
pub mod output;
pub mod parser;
pub mod pep440;

pub use analyzer::PackageAnalyzer;
pub use cache::Cache;
pub use config::Config;
pub use index::{build_index, Index};
pub use model::{PackageReport, Requirement, SpecCategory};
