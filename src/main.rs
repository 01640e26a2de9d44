//! Parley - Multilingual Chat Pipeline
//!
//! Entry point for the `parley` binary: interactive chat, one-shot questions,
//! history management and capability checks.

use std::io::Write;
use std::time::Duration;
use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use tracing_appender::{non_blocking, rolling};

use parley::cli::{Args, Commands, HistoryAction};
use parley::config::Config;
use parley::generate::BackendKind;
use parley::history::ConversationLog;
use parley::ollama::OllamaClient;
use parley::pipeline::{ConversationPipeline, TurnOptions, TurnOutcome};
use parley::setup::{probe_capabilities, CapabilityProbe};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;
    info!("Starting Parley - Multilingual Chat Pipeline");

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("parley.toml").exists() {
                info!("Found parley.toml in current directory, loading...");
                Config::from_file("parley.toml")?
            } else {
                Config::default()
            }
        }
    };

    let history = ConversationLog::new(&config.chat.history_path);

    match args.command {
        Commands::Chat { options } => {
            let pipeline = build_pipeline(&config).await?;
            run_chat(&pipeline, &history, &options.to_options(&config.chat)).await?;
        }
        Commands::Ask { message, options } => {
            let pipeline = build_pipeline(&config).await?;
            let outcome = run_turn(&pipeline, &history, &message, &options.to_options(&config.chat)).await?;
            println!("{}", outcome.final_response);
            println!("{}", outcome.annotation);
        }
        Commands::History { action } => match action {
            HistoryAction::List { limit } => {
                let turns = history.recent(limit).await?;
                if turns.is_empty() {
                    println!("No conversation history found.");
                } else {
                    println!("\nRecent Conversations:");
                    println!("{:<20} {:<12} {:<12} {:<40}", "Time", "Language", "Backend", "Message");
                    println!("{}", "-".repeat(84));

                    for turn in turns {
                        println!(
                            "{:<20} {:<12} {:<12} {:<40}",
                            turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            truncate(&turn.detected_language, 12),
                            turn.backend.as_deref().unwrap_or("fallback"),
                            truncate(&turn.user_message, 40)
                        );
                        println!("{:<46} -> {}", "", truncate(&turn.bot_response, 60));
                    }
                }
            }
            HistoryAction::Clear => {
                let removed = history.clear().await?;
                println!("Cleared {} conversation turns", removed);
            }
        },
        Commands::Check => {
            let statuses = CapabilityProbe::new(config.clone()).report().await;

            println!("\nCapability Status:");
            println!("{:<40} {:<12} {}", "Component", "Status", "Detail");
            println!("{}", "-".repeat(80));
            for status in statuses {
                let state = if status.available { "Available" } else { "Missing" };
                println!("{:<40} {:<12} {}", status.component, state, status.detail);
            }
        }
        Commands::Models { pull } => {
            info!("Listing generation backends...");

            let client = OllamaClient::new(&config.generation.endpoint, Duration::from_secs(5))?;
            let installed = match client.list_models().await {
                Ok(models) => Some(models),
                Err(e) => {
                    warn!("Could not reach ollama at {}: {}", config.generation.endpoint, e);
                    None
                }
            };

            println!("\nGeneration Backends:");
            println!("{:<14} {:<30} {:<10}", "Label", "Model", "Status");
            println!("{}", "-".repeat(56));
            for kind in BackendKind::ALL {
                let model = config.generation.models.for_kind(kind);
                let status = match &installed {
                    Some(models) if models.iter().any(|m| m == model) => "Pulled",
                    Some(_) => "Missing",
                    None => "Unknown",
                };
                println!("{:<14} {:<30} {:<10}", kind.label(), model, status);
            }

            if pull {
                config.generation.auto_pull = true;
                let pipeline = build_pipeline(&config).await?;
                let registry = pipeline
                    .registry()
                    .ok_or_else(|| anyhow::anyhow!("Generation is not available; run `parley check`"))?;

                for kind in BackendKind::ALL {
                    let handle = registry.get(kind).await;
                    match handle.model_name() {
                        Some(model) => println!("{}: ready ({})", kind, model),
                        None => println!("{}: unavailable", kind),
                    }
                }
            }
        }
    }

    info!("Parley finished");
    Ok(())
}

async fn build_pipeline(config: &Config) -> Result<ConversationPipeline> {
    let capabilities = probe_capabilities(config).await;
    Ok(ConversationPipeline::from_config(config, &capabilities)?)
}

/// Run one turn behind a spinner and record it in the history
async fn run_turn(
    pipeline: &ConversationPipeline,
    history: &ConversationLog,
    message: &str,
    options: &TurnOptions,
) -> Result<TurnOutcome> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed}]")?);
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = pipeline.handle_turn(message, options).await;
    spinner.finish_and_clear();

    if let Err(e) = history.append(&outcome.to_turn(message)).await {
        warn!("Failed to save conversation: {}", e);
    }

    Ok(outcome)
}

async fn run_chat(pipeline: &ConversationPipeline, history: &ConversationLog, options: &TurnOptions) -> Result<()> {
    println!("Type your message in any language. /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/quit" || message == "/exit" {
            break;
        }

        let outcome = run_turn(pipeline, history, message, options).await?;
        println!("{}", outcome.final_response);
        println!("  {}", outcome.annotation);
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let parley_dir = std::env::current_dir()?.join(".parley");
    let log_dir = parley_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "parley.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console shows warnings only unless verbose
    let console_level = if verbose { Level::DEBUG } else { Level::WARN };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::from_level(console_level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - level: {}, file: {}",
          log_level, log_dir.join("parley.log").display());

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
