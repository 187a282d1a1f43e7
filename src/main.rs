use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use jacoco_coveralls::config::{Config, Overrides, Settings};
use jacoco_coveralls::payload::{assemble, REPO_TOKEN_ENV};

const CONFIG_FILE: &str = "coveralls.toml";

#[derive(Parser)]
#[command(name = "jacoco-coveralls")]
#[command(about = "Reconcile JaCoCo coverage reports with Java sources for Coveralls")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: coveralls.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log per-file matching details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the Coveralls payload from a JaCoCo report
    Report {
        #[command(flatten)]
        overrides: OverrideArgs,

        /// Write the payload here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the source directories that would be searched, in order
    Sources {
        #[command(flatten)]
        overrides: OverrideArgs,
    },
}

#[derive(Args)]
struct OverrideArgs {
    /// JaCoCo XML report (relative to the project root)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Package prefix stripped from report paths, e.g. com.example
    #[arg(long)]
    root_package: Option<String>,

    /// Project root used for relative file names
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Source directory to search; repeat to search several, in order
    #[arg(long = "source-dir")]
    source_dirs: Vec<PathBuf>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Overrides {
            report: args.report,
            root_package: args.root_package,
            project_dir: args.project_dir,
            source_dirs: args.source_dirs,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let (config, base_dir) = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Report { overrides, output } => {
            let settings = config.resolve(&base_dir, &overrides.into());
            cmd_report(&settings, output.as_deref())
        }
        Commands::Sources { overrides } => {
            let settings = config.resolve(&base_dir, &overrides.into());
            cmd_sources(&settings)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file, falling back to defaults when the default file is absent
fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    let current_dir = std::env::current_dir().context("Could not determine current directory")?;

    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = current_dir.join(CONFIG_FILE);
            if !path.exists() {
                return Ok((Config::default(), current_dir));
            }
            path
        }
    };

    // Canonicalize config path to get absolute path, then get parent
    let config_path = std::fs::canonicalize(&config_path)
        .with_context(|| format!("Could not find config file: {}", config_path.display()))?;

    let base_dir = config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or(current_dir);

    let config = Config::load(&config_path)
        .with_context(|| format!("Could not load {}", config_path.display()))?;

    Ok((config, base_dir))
}

fn cmd_report(settings: &Settings, output: Option<&Path>) -> Result<()> {
    let (payload, unmatched) = assemble(settings, std::env::var(REPO_TOKEN_ENV).ok())?;

    let matched = payload.source_files.len();
    let skipped = unmatched.len();

    match output {
        Some(path) => payload.save(path)?,
        None => payload.write_to(std::io::stdout().lock())?,
    }

    if settings.source_roots.is_empty() {
        eprintln!("{} {}", "•".yellow(), "No source directories configured, nothing to report".dimmed());
    } else {
        eprintln!(
            "{} {} source files reconciled, {} not found in source directories",
            "✓".green(),
            matched.to_string().bold(),
            skipped
        );
    }

    if let Some(path) = output {
        eprintln!("  {} {}", "payload:".dimmed(), path.display().to_string().green());
    }

    Ok(())
}

fn cmd_sources(settings: &Settings) -> Result<()> {
    println!("{} {}", "project:".dimmed(), settings.project_root.display());
    println!("{} {}", "report:".dimmed(), settings.report_path.display());

    if let Some(ref root_package) = settings.root_package {
        println!("{} {}", "root package:".dimmed(), root_package.cyan());
    }

    if settings.source_roots.is_empty() {
        println!("  {}", "No source directories".dimmed());
        return Ok(());
    }

    println!("{}", "Source directories:".bold());

    for dir in &settings.source_roots {
        let marker = if dir.is_dir() { "•".green() } else { "•".red() };
        println!("  {} {}", marker, dir.display());
    }

    Ok(())
}
