//! snare CLI - capture a report from a DevTools panel
//!
//! Usage:
//!   snare init [PATH]           Write the default .snare/config.toml
//!   snare run <URL>             Open URL, run the panel, save its report

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snare_browser::handoff::JsonFileSink;
use snare_browser::runner;
use snare_core::{ArmOrder, SnareConfig, CHROME_PATH_ENV};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "snare")]
#[command(author, version, about = "Capture a report from a DevTools panel")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init {
        /// Base directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Open a page, start the panel operation and save its report
    Run {
        /// Page to load in the inspected tab
        url: String,

        /// Where to write the captured report
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Directory containing .snare/config.toml
        #[arg(long, value_name = "DIR", default_value = ".")]
        config: PathBuf,

        /// Chrome or Chromium executable
        #[arg(long, value_name = "PATH", env = CHROME_PATH_ENV)]
        chrome_path: Option<String>,

        /// Remote debugging port
        #[arg(long)]
        port: Option<u16>,

        /// Install the sniffer before starting the operation
        #[arg(long)]
        arm_before_trigger: bool,

        /// Give up after this many trigger attempts
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Give up triggering after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Also print the report to stdout
        #[arg(long)]
        print: bool,
    },
}

/// Flags of `snare run` that override the configuration file
#[derive(Debug, Default)]
struct RunOverrides {
    output: Option<PathBuf>,
    chrome_path: Option<String>,
    port: Option<u16>,
    arm_before_trigger: bool,
    max_attempts: Option<u32>,
    deadline_secs: Option<u64>,
}

impl RunOverrides {
    fn apply(self, config: SnareConfig) -> SnareConfig {
        let mut config = config.with_chrome_path_override(self.chrome_path);

        if let Some(output) = self.output {
            config.capture.output_path = output;
        }
        if let Some(port) = self.port {
            config.browser.port = port;
        }
        if self.arm_before_trigger {
            config.capture.arm_order = ArmOrder::BeforeTrigger;
        }
        if self.max_attempts.is_some() {
            config.retry.max_attempts = self.max_attempts;
        }
        if self.deadline_secs.is_some() {
            config.retry.deadline_secs = self.deadline_secs;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Run {
            url,
            output,
            config,
            chrome_path,
            port,
            arm_before_trigger,
            max_attempts,
            deadline_secs,
            print,
        } => {
            let overrides = RunOverrides {
                output,
                chrome_path,
                port,
                arm_before_trigger,
                max_attempts,
                deadline_secs,
            };
            cmd_run(url, config, overrides, print).await
        }
    }
}

fn cmd_init(path: PathBuf) -> Result<()> {
    info!("Initializing snare in {:?}", path);

    let config_path =
        SnareConfig::write_default(&path).context("Failed to write default configuration")?;

    println!("Created {}", config_path.display());
    Ok(())
}

async fn cmd_run(url: String, config_dir: PathBuf, overrides: RunOverrides, print: bool) -> Result<()> {
    let config = SnareConfig::load_or_default(&config_dir)
        .with_context(|| format!("Failed to load configuration from {:?}", config_dir))?;
    let config = overrides.apply(config);
    debug!("Effective configuration: {:?}", config);

    let sink = JsonFileSink::new(&config.capture.output_path);
    let outcome = runner::run(&url, &config, &sink)
        .await
        .with_context(|| format!("Capture from {} failed", url))?;

    info!(
        "Report written to {} ({} trigger attempt(s), {:?})",
        sink.path().display(),
        outcome.trigger.attempts,
        outcome.trigger.elapsed
    );

    if print {
        let pretty = serde_json::to_string_pretty(&outcome.report)
            .context("Failed to format report")?;
        println!("{}", pretty);
    }

    Ok(())
}
