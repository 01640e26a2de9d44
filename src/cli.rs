use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ChatConfig;
use crate::pipeline::TurnOptions;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat interactively; type /quit to leave
    Chat {
        #[command(flatten)]
        options: TurnArgs,
    },

    /// Send a single message and print the reply
    Ask {
        /// Message in any language
        message: String,

        #[command(flatten)]
        options: TurnArgs,
    },

    /// Inspect or clear the conversation history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Check which optional capabilities are available
    Check,

    /// List generation backends and their model status
    Models {
        /// Acquire every backend model now
        #[arg(long)]
        pull: bool,
    },
}

/// Per-request options; unset values come from the [chat] config section
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TurnArgs {
    /// Generation backend: fast, better or instruction
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Language for replies (auto keeps English)
    #[arg(short, long)]
    pub output_language: Option<String>,

    /// Skip translation in both directions
    #[arg(long)]
    pub no_translation: bool,
}

impl TurnArgs {
    /// Overlay command-line choices on the configured chat defaults
    pub fn to_options(&self, chat: &ChatConfig) -> TurnOptions {
        let mut options = TurnOptions::from(chat);
        if let Some(backend) = &self.backend {
            options.backend_label = backend.clone();
        }
        if let Some(language) = &self.output_language {
            options.output_language = language.clone();
        }
        if self.no_translation {
            options.translation_enabled = false;
        }
        options
    }
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Show recent conversation turns, newest first
    List {
        /// Number of turns to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Delete all stored conversation turns
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_arguments() {
        let args = Args::try_parse_from([
            "parley", "ask", "Hola", "--backend", "better", "--output-language", "spanish",
        ]).unwrap();

        match args.command {
            Commands::Ask { message, options } => {
                assert_eq!(message, "Hola");
                let options = options.to_options(&ChatConfig::default());
                assert_eq!(options.backend_label, "better");
                assert_eq!(options.output_language, "spanish");
                assert!(options.translation_enabled);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_unset_options_keep_config_defaults() {
        let options = TurnArgs { no_translation: true, ..TurnArgs::default() }
            .to_options(&ChatConfig::default());
        assert_eq!(options.backend_label, "fast");
        assert_eq!(options.output_language, "auto");
        assert!(!options.translation_enabled);
    }

    #[test]
    fn test_history_limit_default() {
        let args = Args::try_parse_from(["parley", "history", "list"]).unwrap();
        assert!(matches!(args.command, Commands::History { action: HistoryAction::List { limit: 50 } }));
    }
}
