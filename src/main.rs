//! Sieve CLI entry point.
//!
//! Provides `classify`, `prompt`, `extract`, and `check` subcommands for
//! running a batch, previewing the prompt, parsing a single reply, or
//! probing the model server.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use sieve::batch::BatchClassifier;
use sieve::classify::{extract, prompt};
use sieve::config::{self, Config};
use sieve::logging::{self, LoggingGuard};
use sieve::providers;
use sieve::table::EmailTable;

/// Sieve: sort important email from noise with a local LLM.
#[derive(Parser)]
#[command(name = "sieve", version, about)]
struct Cli {
    /// Config file (default: $SIEVE_CONFIG_PATH or ~/.sieve/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write JSON logs to this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Classify every row of a CSV of emails.
    Classify {
        /// Input CSV with subject and sender columns.
        input: PathBuf,
        /// Output file (.csv or .jsonl); CSV on stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Model spec override, e.g. `ollama/llama3.1:8b`.
        #[arg(long)]
        model: Option<String>,
        /// Maximum model requests in flight.
        #[arg(long)]
        concurrency: Option<usize>,
        /// Add a `raw_reply` column with the unparsed model output.
        #[arg(long)]
        keep_raw: bool,
    },
    /// Print the prompt that would be sent for one email.
    Prompt {
        /// Subject line.
        #[arg(long)]
        subject: String,
        /// Sender.
        #[arg(long)]
        sender: String,
    },
    /// Parse one raw model reply (file or stdin) and print it as JSON.
    Extract {
        /// File holding the reply; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Check that the configured model server is reachable.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Prompt { subject, sender } => {
            print!("{}", prompt::build(&subject, &sender));
            Ok(())
        }
        Command::Extract { file } => handle_extract(file.as_deref()),
        Command::Classify {
            input,
            output,
            model,
            concurrency,
            keep_raw,
        } => {
            let (config, _logging_guard) =
                setup(cli.config.as_deref(), cli.log_dir, |config| {
                    if let Some(spec) = model {
                        config.model.spec = spec;
                    }
                    if let Some(n) = concurrency {
                        config.batch.concurrency = n;
                    }
                    config.batch.keep_raw |= keep_raw;
                })?;
            handle_classify(&config, &input, output.as_deref()).await
        }
        Command::Check => {
            let (config, _logging_guard) = setup(cli.config.as_deref(), cli.log_dir, |_| {})?;
            handle_check(&config).await
        }
    }
}

/// Load config, apply CLI overrides, validate once, then start logging.
///
/// The returned guard must be held until the command finishes.
fn setup(
    config_path: Option<&Path>,
    log_dir: Option<PathBuf>,
    overrides: impl FnOnce(&mut Config),
) -> anyhow::Result<(Config, Option<LoggingGuard>)> {
    let mut config = config::load(config_path).context("failed to load config")?;
    overrides(&mut config);
    config.validate().context("invalid configuration")?;

    let guard = match log_dir.or_else(|| config.logging.dir.clone()) {
        Some(dir) => Some(logging::init_with_file(&dir)?),
        None => {
            logging::init_cli();
            None
        }
    };
    Ok((config, guard))
}

/// Run the full batch over one input file.
async fn handle_classify(
    config: &Config,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let table = EmailTable::from_csv_path(
        input,
        &config.batch.subject_column,
        &config.batch.sender_column,
    )
    .with_context(|| format!("failed to load {}", input.display()))?;
    info!(path = %input.display(), rows = table.len(), "loaded email table");

    let provider =
        providers::from_model_config(&config.model).context("failed to create model provider")?;
    if !provider.is_available().await {
        anyhow::bail!(
            "model server for '{}' is not reachable; is it running?",
            provider.model_id()
        );
    }

    let classifier = BatchClassifier::from_config(provider, config);
    let classified = classifier.run(table, config.batch.keep_raw).await?;

    match output {
        Some(path) => {
            classified
                .write_path(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "results written");
        }
        None => classified.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}

/// Parse a single reply and print the result (`null` when absent).
fn handle_extract(file: Option<&Path>) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    let result = extract(&raw);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Probe the configured model server.
async fn handle_check(config: &Config) -> anyhow::Result<()> {
    let provider =
        providers::from_model_config(&config.model).context("failed to create model provider")?;
    if provider.is_available().await {
        info!(model = %provider.model_id(), "model server reachable");
        println!("ok: {}", provider.model_id());
        Ok(())
    } else {
        warn!(model = %provider.model_id(), "model server unreachable");
        anyhow::bail!("model server for '{}' is not reachable", provider.model_id())
    }
}
