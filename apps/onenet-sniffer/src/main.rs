use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use onenet_sniff::AnalysisSession;
use tracing::{error, info};

mod config;
mod report;

use crate::config::SnifferConfig;
use crate::report::{write_records, write_summary, OutputFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML, or a .env file)
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Output format, overriding the configuration
    #[arg(long, value_enum, global = true)]
    format: Option<OutputFormat>,
    /// Filter command applied after the configured ones, e.g. "src add 0x1-0x4"
    #[arg(long = "filter", short = 'f', global = true)]
    filters: Vec<String>,
    /// Additional network key (32 hex digits)
    #[arg(long = "key", short = 'k', global = true)]
    keys: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode hex-encoded packets given on the command line
    Decode {
        /// Capture timestamp of the first packet; later ones follow at +1 ms
        #[arg(long, default_value_t = 0)]
        timestamp: u64,
        #[arg(required = true)]
        packets: Vec<String>,
    },
    /// Analyze a capture file ("-" reads standard input)
    Analyze {
        capture: PathBuf,
        /// Skip the batch summary line
        #[arg(long)]
        no_summary: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    fn apply_overrides(&self, config: &mut SnifferConfig) {
        if let Some(format) = self.format {
            config.output = format;
        }
        config.filter.extend(self.filters.iter().cloned());
        config.network_keys.extend(self.keys.iter().cloned());
    }
}

fn open_capture(path: &Path) -> io::Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    Ok(Box::new(BufReader::new(File::open(path)?)))
}

fn run(command: Commands, config: &SnifferConfig) -> Result<ExitCode, Box<dyn Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Config => {
            write!(out, "{}", config.to_toml()?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Decode { timestamp, packets } => {
            let mut session = AnalysisSession::new(config.sniff_config()?)?;
            let mut failures = 0_usize;
            for (index, text) in packets.iter().enumerate() {
                let capture_ms = timestamp.saturating_add(index as u64);
                if let Err(err) = session.ingest_hex(capture_ms, text) {
                    error!(packet = index, "{err}");
                    failures += 1;
                }
            }
            if let Some(window) = config.window {
                session.restrict_to_window(window);
            }
            write_records(&mut out, &session.records(), config.output)?;
            Ok(if failures == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Analyze {
            capture,
            no_summary,
        } => {
            let mut session = AnalysisSession::new(config.sniff_config()?)?;
            let reader = open_capture(&capture)
                .map_err(|err| format!("cannot open {}: {err}", capture.display()))?;
            info!("analyzing {}", capture.display());
            let summary = session.ingest_capture(reader);
            if let Some(window) = config.window {
                session.restrict_to_window(window);
            }
            let records = session.records();
            write_records(&mut out, &records, config.output)?;
            if !no_summary {
                write_summary(&mut out, &summary, records.len(), config.output)?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let filter = std::env::var("ONENET_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match SnifferConfig::new(cli.config.clone()) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
