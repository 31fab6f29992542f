use crate::model::{PackageReport, SpecCategory, Tally, UNKNOWN};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Share")]
    share: String,
}

#[derive(Tabled)]
struct VulnRow {
    #[tabled(rename = "Release")]
    version: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Advisories")]
    advisories: String,
}

#[derive(Tabled)]
struct PopularRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Package")]
    name: String,
    #[tabled(rename = "Count")]
    count: u64,
}

pub fn print_report_table(report: &PackageReport) -> Result<()> {
    println!();
    println!(
        "Package: {} ({} requirements, generated {})",
        report.name,
        report.count,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if report.count == 0 {
        println!();
        println!("No requirements found for this package.");
        return Ok(());
    }

    let specs: Vec<(String, u64)> = SpecCategory::ALL
        .iter()
        .map(|c| (c.to_string(), report.specs.get(*c)))
        .collect();
    print_counts("Specifiers", &specs, report.count);

    print_counts("Releases", &tally_rows(&report.releases), report.count);
    print_counts(
        "Major releases",
        &tally_rows(&report.major_releases),
        report.count,
    );

    let security = vec![
        ("secure".to_string(), report.security.secure),
        ("insecure".to_string(), report.security.insecure),
        ("unknown".to_string(), report.security.unknown),
    ];
    print_counts("Security", &security, report.count);

    if !report.vulnerable_releases.is_empty() {
        println!();
        println!(
            "Found {} vulnerable releases:",
            report.vulnerable_releases.len()
        );
        println!();

        let rows: Vec<VulnRow> = report
            .vulnerable_releases
            .iter()
            .map(|v| VulnRow {
                version: v.version.clone(),
                count: v.count,
                advisories: truncate(&v.advisories.join(", "), 60),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    Ok(())
}

fn tally_rows(tally: &Tally) -> Vec<(String, u64)> {
    tally
        .iter()
        // an empty unknown bucket is noise in a table
        .filter(|(key, count)| !(*key == UNKNOWN && *count == 0))
        .map(|(key, count)| (key.to_string(), count))
        .collect()
}

fn print_counts(title: &str, counts: &[(String, u64)], total: u64) {
    println!();
    println!("{}:", title);

    let rows: Vec<CountRow> = counts
        .iter()
        .map(|(key, count)| CountRow {
            key: key.clone(),
            count: *count,
            share: share(*count, total),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_popular_table(ranking: &[(String, u64)]) -> Result<()> {
    if ranking.is_empty() {
        println!("No packages in index.");
        return Ok(());
    }

    let rows: Vec<PopularRow> = ranking
        .iter()
        .enumerate()
        .map(|(i, (name, count))| PopularRow {
            rank: i + 1,
            name: truncate(name, 50),
            count: *count,
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
    Ok(())
}

fn share(count: u64, total: u64) -> String {
    if total == 0 {
        return "-".to_string();
    }
    format!("{:.1}%", count as f64 * 100.0 / total as f64)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
