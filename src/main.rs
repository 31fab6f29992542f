use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use reqstats::{
    build_index,
    cache::Cache,
    checker::{default_checker, default_release_source},
    config::Config,
    index::Index,
    logging,
    output::{print_popular, print_report, OutputFormat},
    PackageAnalyzer,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "reqstats")]
#[command(
    author,
    version,
    about = "Index requirements files and report how packages are pinned"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the package/spec index from a newline-delimited JSON corpus
    Index {
        /// Corpus of JSON records with a C_content field
        #[arg(long, default_value = "data.json")]
        data: PathBuf,

        /// Where to write the index
        #[arg(long, default_value = "index.json")]
        index: PathBuf,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Rank packages by how often they are required
    Popular {
        #[arg(long, default_value = "index.json")]
        index: PathBuf,

        /// Show only the first N packages
        #[arg(short = 'n', long, default_value_t = 25)]
        top: usize,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Report pinning, release and security statistics for one package
    Package {
        /// Package name, normalized before lookup
        name: String,

        #[arg(long, default_value = "index.json")]
        index: PathBuf,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write the JSON report to a file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip vulnerability checking
        #[arg(long)]
        no_vuln_check: bool,

        /// Clear cache before fetching releases
        #[arg(long)]
        clear_cache: bool,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear the cache
    ClearCache,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Index {
            data,
            index,
            no_progress,
        } => {
            run_index(&data, &index, !no_progress)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Popular { index, top, format } => {
            let format = parse_format(format, &config)?;
            let index = Index::load(&index)?;

            let ranking: Vec<(String, u64)> = index
                .popular()
                .into_iter()
                .filter(|(name, _)| !config.ignore.should_ignore_package(name))
                .take(top)
                .collect();

            print_popular(&ranking, format)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Package {
            name,
            index,
            format,
            output,
            no_vuln_check,
            clear_cache,
        } => {
            if clear_cache {
                Cache::with_ttl_hours(config.cache_ttl_hours).clear()?;
            }

            let format = parse_format(format, &config)?;
            let skip_vuln = no_vuln_check || config.skip_vuln_check;
            run_package(&name, &index, format, output, skip_vuln, &config).await?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(&config, init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            let removed = Cache::new().clear()?;
            println!("Cache cleared ({} entries).", removed);
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn parse_format(format: Option<String>, config: &Config) -> Result<OutputFormat> {
    let format = format.unwrap_or_else(|| config.default_format.clone());
    OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))
}

fn run_index(data: &Path, index_path: &Path, show_progress: bool) -> Result<()> {
    let file =
        File::open(data).with_context(|| format!("Failed to open corpus {}", data.display()))?;

    let (index, stats) = if show_progress {
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
                .progress_chars("#>-"),
        );
        pb.set_message("Indexing...");

        let result = build_index(BufReader::new(pb.wrap_read(file)));
        match &result {
            Ok((index, _)) => pb.finish_with_message(format!("{} packages", index.len())),
            Err(_) => pb.abandon(),
        }
        result?
    } else {
        build_index(BufReader::new(file))?
    };

    index.save(index_path)?;
    info!(path = %index_path.display(), "index written");
    println!(
        "Indexed {} requirements from {} records ({} packages) into {}",
        stats.requirements,
        stats.with_content,
        index.len(),
        index_path.display()
    );
    Ok(())
}

async fn run_package(
    name: &str,
    index_path: &Path,
    format: OutputFormat,
    output_file: Option<PathBuf>,
    skip_vuln_check: bool,
    config: &Config,
) -> Result<()> {
    let is_interactive = format == OutputFormat::Table;
    let name = reqstats::model::normalize_name(name);
    let index = Index::load(index_path)?;

    let releases = default_release_source(config);
    let checker = default_checker(config);

    let mut analyzer = PackageAnalyzer::new(&releases).with_ignore(config.ignore.clone());
    if !skip_vuln_check {
        analyzer = analyzer.with_checker(&checker);
    }

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Analyzing {}...", name));
        Some(pb)
    } else {
        None
    };

    let result = analyzer.analyze(&index, &name).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let report = result?;

    if let Some(path) = output_file {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        if is_interactive {
            println!("Report written to: {}", path.display());
        }
    } else {
        print_report(&report, format)?;
    }

    Ok(())
}

fn handle_config(config: &Config, init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
        } else {
            Config::default().save()?;
            println!("Wrote default config to: {}", config_path.display());
            println!();
            println!("{}", Config::generate_default_config());
        }
        return Ok(());
    }

    let source = if config_path.exists() {
        config_path.display().to_string()
    } else {
        "built-in defaults (run 'reqstats config --init' to create a file)".to_string()
    };
    println!("Settings from: {}", source);
    println!();
    println!("{}", config.summary());
    println!();
    println!(
        "Release cache: {}",
        Cache::with_ttl_hours(config.cache_ttl_hours).dir().display()
    );

    Ok(())
}
