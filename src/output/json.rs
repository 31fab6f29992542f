use crate::model::PackageReport;
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct PopularEntry<'a> {
    name: &'a str,
    count: u64,
}

pub fn print_report_json(report: &PackageReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}

/// Ranking as a JSON array of `{name, count}` objects, in rank order.
pub fn popular_json(ranking: &[(String, u64)]) -> Result<String> {
    let entries: Vec<PopularEntry> = ranking
        .iter()
        .map(|(name, count)| PopularEntry {
            name,
            count: *count,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

pub fn print_popular_json(ranking: &[(String, u64)]) -> Result<()> {
    println!("{}", popular_json(ranking)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SecurityCounts, SpecCounts, Tally, UNKNOWN};
    use chrono::Utc;

    #[test]
    fn test_popular_json_keeps_rank_order() {
        let ranking = vec![("six".to_string(), 3), ("flask".to_string(), 2)];
        let value: serde_json::Value = serde_json::from_str(&popular_json(&ranking).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"name": "six", "count": 3},
                {"name": "flask", "count": 2}
            ])
        );
    }

    #[test]
    fn test_report_json_shape() {
        let mut releases = Tally::new();
        releases.add("1.11", 2);
        releases.add(UNKNOWN, 1);
        let report = PackageReport {
            name: "django".to_string(),
            generated_at: Utc::now(),
            count: 3,
            specs: SpecCounts {
                pinned: 2,
                unpinned: 1,
                ..SpecCounts::default()
            },
            major_releases: releases.clone(),
            releases,
            security: SecurityCounts {
                secure: 2,
                insecure: 0,
                unknown: 1,
            },
            vulnerable_releases: vec![],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""releases":{"1.11":2,"unknown":1}"#));
        assert!(json.contains(
            r#""specs":{"unpinned":1,"range":0,"pinned":2,"compatible":0,"unknown":0}"#
        ));
        assert!(json.contains(r#""security":{"secure":2,"insecure":0,"unknown":1}"#));
        assert!(json.contains(r#""vulnerable_releases":[]"#));
    }
}
