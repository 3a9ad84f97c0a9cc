use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use openapi_merge_core::{ConflictPolicy, RemainderOrder, external_references};
use openapi_merge_resolve::{MergeConfig, merge_files_with, merge_source, merge_to_string};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI-side conflict policy with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliConflictPolicy {
    FirstWins,
    LastWins,
    Error,
}

impl From<CliConflictPolicy> for ConflictPolicy {
    fn from(policy: CliConflictPolicy) -> Self {
        match policy {
            CliConflictPolicy::FirstWins => Self::FirstWins,
            CliConflictPolicy::LastWins => Self::LastWins,
            CliConflictPolicy::Error => Self::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliRemainderOrder {
    Lexicographic,
    Source,
}

impl From<CliRemainderOrder> for RemainderOrder {
    fn from(order: CliRemainderOrder) -> Self {
        match order {
            CliRemainderOrder::Lexicographic => Self::Lexicographic,
            CliRemainderOrder::Source => Self::Source,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ReportFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "openapi-merge")]
#[command(version, about = "Merge a multi-file OpenAPI description into one document")]
struct Cli {
    /// Log every loaded file and rewritten reference to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge a root document and everything it references into one file.
    Merge(MergeArgs),
    /// Verify that a document merges into a stable, self-contained result.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct SettingsArgs {
    /// YAML merge configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Policy for component names defined in more than one file.
    #[arg(long)]
    on_conflict: Option<CliConflictPolicy>,
    /// Order of fields without a fixed position.
    #[arg(long)]
    remainder_order: Option<CliRemainderOrder>,
}

impl SettingsArgs {
    /// Loads the configuration file, then applies command-line overrides.
    fn resolve(&self) -> Result<MergeConfig, String> {
        let mut config = match &self.config {
            Some(path) => MergeConfig::load(path).map_err(|err| err.to_string())?,
            None => MergeConfig::default(),
        };
        if let Some(policy) = self.on_conflict {
            config.on_conflict = policy.into();
        }
        if let Some(order) = self.remainder_order {
            config.remainder_order = order.into();
        }
        debug!(?config, "Resolved merge configuration");
        Ok(config)
    }
}

#[derive(Debug, Args)]
struct MergeArgs {
    /// Root OpenAPI document.
    #[arg(long)]
    input: PathBuf,
    /// Path of the merged document; parent directories are created.
    #[arg(long)]
    output: PathBuf,
    /// Print the full merge report instead of a one-line summary.
    #[arg(long)]
    report: Option<ReportFormat>,
    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Root OpenAPI document.
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    settings: SettingsArgs,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Merge(args) => run_merge(args),
        Command::Check(args) => run_check(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_merge(args: MergeArgs) -> Result<(), String> {
    let config = args.settings.resolve()?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create output directory '{}': {err}",
                parent.display()
            )
        })?;
    }

    let report =
        merge_files_with(&args.input, &args.output, &config).map_err(|err| err.to_string())?;

    match args.report {
        None => {
            let components: usize = report.components.values().sum();
            println!(
                "Merged {} paths and {} components from {} files into {}",
                report.paths,
                components,
                report.files.len() + 1,
                args.output.display()
            );
            if !report.dropped.is_empty() {
                println!("Dropped duplicates: {}", report.dropped.len());
            }
        }
        Some(ReportFormat::Json) => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|err| format!("Failed to serialize report: {err}"))?;
            println!("{json}");
        }
        Some(ReportFormat::Yaml) => {
            let yaml = serde_yaml::to_string(&report)
                .map_err(|err| format!("Failed to serialize report: {err}"))?;
            print!("{yaml}");
        }
    }
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let config = args.settings.resolve()?;
    let merged = merge_to_string(&args.input, &config).map_err(|err| err.to_string())?;

    let parsed: serde_yaml::Value = serde_yaml::from_str(&merged)
        .map_err(|err| format!("Merged output is not valid YAML: {err}"))?;
    let remaining = external_references(&parsed);
    if !remaining.is_empty() {
        return Err(format!(
            "{} external references remain after merging: {}",
            remaining.len(),
            remaining.join(", ")
        ));
    }

    let again = merge_source(&args.input, &merged, &config).map_err(|err| err.to_string())?;
    if again.text != merged {
        return Err("merging the merged output again changes it".to_string());
    }

    println!("{}: ok", args.input.display());
    Ok(())
}
