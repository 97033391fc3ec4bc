// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rez_agent_cli::commands::{self, DaemonClient, SchemaKind};
use rez_agent_cli::config::{load_config, validate_config};
use rez_agent_cli::format::{Formatter, OutputFormat};
use tracing_subscriber::EnvFilter;

/// Exit code for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "rez-agent", version, about = "Client for the rez-agent directive pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a rez-agent-cli config TOML file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured daemon URL.
    #[arg(long)]
    daemon_url: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormatArg::Text)]
    output: OutputFormatArg,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormatArg {
    Json,
    JsonPretty,
    Text,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(v: OutputFormatArg) -> Self {
        match v {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::JsonPretty => OutputFormat::JsonPretty,
            OutputFormatArg::Text => OutputFormat::Text,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemaArg {
    WebActionPayload,
    Directive,
    Result,
}

impl From<SchemaArg> for SchemaKind {
    fn from(v: SchemaArg) -> Self {
        match v {
            SchemaArg::WebActionPayload => SchemaKind::WebActionPayload,
            SchemaArg::Directive => SchemaKind::Directive,
            SchemaArg::Result => SchemaKind::Result,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a web_action directive built from a payload JSON file.
    Submit {
        /// Path to a `WebActionPayload` JSON file.
        payload: PathBuf,
    },

    /// Fetch a directive's current status.
    Status {
        /// Directive id.
        id: String,
    },

    /// Fetch every result recorded for a directive.
    Results {
        /// Directive (message) id.
        message_id: String,
    },

    /// Validate a payload JSON file without contacting the daemon.
    Validate {
        /// Path to a `WebActionPayload` JSON file.
        payload: PathBuf,
    },

    /// Print a JSON schema to stdout.
    Schema {
        /// Which schema to print.
        #[arg(value_enum)]
        kind: SchemaArg,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug { EnvFilter::new("rez_agent_cli=debug") } else { EnvFilter::new("rez_agent_cli=info") };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let formatter = Formatter::new(cli.output.into());

    match cli.command {
        Commands::Validate { payload } => {
            commands::validate_payload_file(&payload)?;
            println!("{}", payload.display());
            Ok(())
        }
        Commands::Schema { kind } => {
            println!("{}", commands::schema_json(kind.into())?);
            Ok(())
        }
        other => run_daemon_command(cli.config.as_deref(), cli.daemon_url, &formatter, other).await,
    }
}

async fn run_daemon_command(
    config_path: Option<&std::path::Path>,
    daemon_url_override: Option<String>,
    formatter: &Formatter,
    command: Commands,
) -> Result<()> {
    let mut config = load_config(config_path).context("loading cli configuration")?;
    if let Some(url) = daemon_url_override {
        config.daemon_url = url;
    }
    validate_config(&config).context("validating cli configuration")?;

    let client = DaemonClient::new(config.daemon_url.clone(), config.timeout())?;

    match command {
        Commands::Submit { payload } => {
            let content = std::fs::read_to_string(&payload).with_context(|| format!("read {}", payload.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&content).with_context(|| format!("parse {}", payload.display()))?;
            let directive = client.submit_directive(ra_core::directive::DirectiveKind::WebAction, value).await?;
            println!("{}", formatter.format_directive(&directive));
            Ok(())
        }
        Commands::Status { id } => {
            let directive = client.get_directive(&id).await?;
            println!("{}", formatter.format_directive(&directive));
            Ok(())
        }
        Commands::Results { message_id } => {
            let results = client.get_results(&message_id).await?;
            println!("{}", formatter.format_results(&results));
            Ok(())
        }
        Commands::Validate { .. } | Commands::Schema { .. } => unreachable!("handled before reaching the daemon"),
    }
}
