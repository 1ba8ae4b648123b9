//! ankisync CLI - Spreadsheet vocabulary to Anki notes.

use anyhow::{Context, Result};
use ankisync::models::SourceConfig;
use ankisync::{
    AnkiClient, BatchRunner, CheckpointManager, Config, CsvSheet, GoogleSheet, OllamaClient,
    RowPipeline, RowSource, RunOptions, RunSummary, cleanup, models::flatten_rows,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*};

#[derive(Parser)]
#[command(name = "ankisync")]
#[command(version)]
#[command(about = "Turn spreadsheet vocabulary rows into Anki notes with LLM-generated explanations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process pending rows and add them to Anki
    Run {
        /// Keep processed rows in the source
        #[arg(long)]
        no_cleanup: bool,

        /// Attempts per row before giving up
        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory {dir:?}"))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {path:?}"))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(level)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .try_init()
        .context("Failed to set subscriber")
}

fn print_example_config() {
    let example = r#"# ankisync configuration file

[ollama]
endpoint = "http://localhost:11434/api/generate"
model = "mixtral"
timeout_secs = 30

[anki]
endpoint = "http://localhost:8765"
model_name = "Basic"
tags = ["auto-generated"]
timeout_secs = 30

[source]
kind = "csv"
path = "words.csv"
# kind = "sheets"
# spreadsheet_id = "1AbC..."
# range = "Sheet1!A:D"
# sheet_id = 0
# token = "${GOOGLE_SHEETS_TOKEN}"   # or set token_env

[checkpoint]
path = "processed_rows.json"

[run]
max_retries = 3
cleanup = true
progress = true

[logging]
file = "logs/processing.log"

# Optional; when given, only the listed languages have templates.
# [prompts]
# german = "Please explain what this word means: {word}, give several example sentences in German"
"#;
    println!("{example}");
}

fn load_config(path: &Path) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))
}

fn build_source(config: &SourceConfig) -> Result<Box<dyn RowSource>> {
    let source: Box<dyn RowSource> = match config {
        SourceConfig::Csv(csv) => Box::new(CsvSheet::new(&csv.path)),
        SourceConfig::Sheets(sheets) => {
            Box::new(GoogleSheet::new(sheets).context("Failed to create Google Sheets client")?)
        }
    };
    Ok(source)
}

fn print_summary(summary: &RunSummary) {
    println!("\n=== Processing Complete ===");
    println!("Processed:   {}", summary.total);
    println!("Successful:  {}", summary.successful);
    println!("Failed:      {}", summary.failed);
    println!("Deleted:     {}", summary.deleted_rows);
    if let Some(started_at) = summary.started_at {
        println!("Started:     {}", started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Runtime:     {:.1}s", summary.runtime_secs);

    if !summary.failures.is_empty() {
        println!("\nFailed rows:");
        for failure in &summary.failures {
            println!("  Row {}: {}", failure.row_index, failure.error);
        }
    }
}

async fn run(config: Config, no_cleanup: bool, max_retries: Option<u32>) -> Result<()> {
    let started_at = Utc::now();
    let start = Instant::now();

    let source = build_source(&config.source)?;
    let rows = source
        .read_rows()
        .await
        .context("Failed to read rows from source")?;
    let entries = flatten_rows(&rows);

    if entries.is_empty() {
        info!("No vocabulary entries to process");
        return Ok(());
    }

    let generator =
        Arc::new(OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?);
    let sink = Arc::new(AnkiClient::new(&config.anki).context("Failed to create Anki client")?);
    let pipeline = RowPipeline::new(generator, sink, config.prompts.clone(), &config.anki);

    let checkpoint = CheckpointManager::new(&config.checkpoint.path)
        .context("Failed to create checkpoint manager")?;

    let mut options = RunOptions::from(&config.run);
    if let Some(max_retries) = max_retries {
        options.max_retries = max_retries;
    }

    let mut runner = BatchRunner::new(pipeline, checkpoint, options);
    let results = runner.run(&entries).await?;

    let mut summary = RunSummary::from_results(&results);
    summary.started_at = Some(started_at);

    if config.run.cleanup && !no_cleanup {
        let report = cleanup(&results, source.as_ref()).await;
        if report.deleted {
            summary.deleted_rows = report.requested.len();
        } else if let Some(error) = report.error {
            warn!(%error, "Source rows were kept; they are already in the checkpoint");
        }
    } else {
        info!("Cleanup disabled, source rows kept");
    }

    summary.runtime_secs = start.elapsed().as_secs_f64();
    print_summary(&summary);
    Ok(())
}

/// Load the config and install logging; every command but `example` starts here.
fn init(path: &Path, verbose: bool) -> Result<Config> {
    let config = load_config(path)?;
    setup_logging(verbose, config.logging.file.as_deref())?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let missing = config.prompts.missing_languages();
    if !missing.is_empty() {
        let names: Vec<_> = missing.iter().map(|l| l.as_str()).collect();
        anyhow::bail!("No prompt template for: {}", names.join(", "));
    }

    if let SourceConfig::Sheets(sheets) = &config.source {
        sheets
            .resolve_token()
            .context("Failed to resolve Google Sheets token")?;
    }

    info!("Configuration is valid");
    info!("  Model: {} at {}", config.ollama.model, config.ollama.endpoint);
    info!("  AnkiConnect: {}", config.anki.endpoint);
    match &config.source {
        SourceConfig::Csv(csv) => info!("  Source: CSV file {:?}", csv.path),
        SourceConfig::Sheets(sheets) => {
            info!("  Source: spreadsheet {} ({})", sheets.spreadsheet_id, sheets.range)
        }
    }
    info!("  Checkpoint: {:?}", config.checkpoint.path);
    info!("  Max retries: {}", config.run.max_retries);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Example => print_example_config(),

        Commands::Validate => {
            let config = init(&cli.config, cli.verbose)?;
            validate(&config)?;
        }

        Commands::Run {
            no_cleanup,
            max_retries,
        } => {
            let config = init(&cli.config, cli.verbose)?;
            run(config, no_cleanup, max_retries).await?;
        }
    }

    Ok(())
}
