mod cli;
mod json;

pub use cli::{print_popular_table, print_report_table};
pub use json::{popular_json, print_popular_json, print_report_json};

use crate::model::PackageReport;
use anyhow::Result;

/// Output format for reports and rankings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_report(report: &PackageReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_report_table(report),
        OutputFormat::Json => print_report_json(report),
    }
}

pub fn print_popular(ranking: &[(String, u64)], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_popular_table(ranking),
        OutputFormat::Json => print_popular_json(ranking),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("sarif").is_err());
    }
}
