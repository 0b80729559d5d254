//! newcov reports which lines added since the mainline branch are not covered
//! by tests, by intersecting `git diff` output with a term-missing coverage
//! report.

use clap::error::ErrorKind;
use clap::{ArgAction, Parser, ValueEnum};
use newcov_adapters_repo::{GitWorkspace, resolve_repo_root};
use newcov_app::{AppError, RunOptions};
use newcov_config::{
    CliOverrides, Config, ConfigError, Format, discover_config, load_config, resolve_config,
    validate_extension,
};
use newcov_render::{render_json, render_text};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Report new lines that are not covered by tests.
#[derive(Debug, Parser)]
#[command(name = "newcov")]
#[command(about = "Report new lines that are not covered by tests.")]
#[command(version)]
struct Cli {
    /// Compare against the merge-base of HEAD and this ref instead of the mainline
    #[arg(short = 'b', long = "base")]
    base: Option<String>,

    /// Read the coverage report from this file instead of running the coverage command
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Path to config file (default: auto-discover newcov.toml)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Repository root git and the coverage command run in
    #[arg(long)]
    root: Option<PathBuf>,

    /// Output format (overrides config file)
    #[arg(long, value_enum)]
    format: Option<CliFormat>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

/// CLI output format option
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliFormat {
    Text,
    Json,
}

impl From<CliFormat> for Format {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Text => Format::Text,
            CliFormat::Json => Format::Json,
        }
    }
}

/// CLI errors
#[derive(Debug, Error)]
enum CliError {
    #[error("Failed to load config: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("{0}")]
    App(#[from] AppError),
}

const EXIT_CODE_ERROR: i32 = 1;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(clap_err) => {
            let _ = clap_err.print();
            std::process::exit(usage_exit_code(&clap_err));
        }
    };
    init_tracing(cli.verbose, cli.quiet);

    let exit_code = match run(cli) {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("error: {}", e);
            EXIT_CODE_ERROR
        }
    };
    std::process::exit(exit_code);
}

/// `--help` and `--version` succeed; every usage error is a failed run.
fn usage_exit_code(clap_err: &clap::Error) -> i32 {
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_CODE_ERROR,
    }
}

/// `RUST_LOG` wins over the verbosity flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = log_level(verbose, quiet);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let loaded = match &cli.config {
        Some(path) => Some(load_config(path)?),
        None => {
            let cwd = std::env::current_dir().map_err(CliError::WorkingDir)?;
            discover_config(&cwd)?.map(|(path, config)| {
                debug!(path = %path.display(), "loaded config");
                config
            })
        }
    };

    execute(&cli, loaded.as_ref())
}

fn execute(cli: &Cli, config: Option<&Config>) -> Result<String, CliError> {
    let overrides = CliOverrides {
        base: cli.base.clone(),
        report: cli.file.clone(),
        format: cli.format.map(Format::from),
    };
    let effective = resolve_config(config, &overrides);
    validate_extension(&effective.source_extension)?;

    let repo_root = resolve_repo_root(cli.root.as_deref());
    debug!(root = %repo_root.display(), "resolved repository root");
    let workspace = GitWorkspace::new(repo_root, effective.coverage_command);

    let options = RunOptions {
        base_ref: effective.base,
        report_path: effective.report,
        mainline: effective.mainline,
        source_extension: effective.source_extension,
    };
    let report = newcov_app::run(&options, &workspace)?;

    Ok(match effective.format {
        Format::Text => render_text(&report),
        Format::Json => render_json(&report),
    })
}
