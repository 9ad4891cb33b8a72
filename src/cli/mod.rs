//! CLI argument parsing and command routing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// chatbridge: chat with LLM backends from the terminal
#[derive(Debug, Parser)]
#[command(name = "chatbridge")]
#[command(about = "Chat with local and hosted LLM backends", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings store file
    #[arg(long, global = true, env = "CHATBRIDGE_STORE")]
    pub store: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Chat with a bot; reads prompts from stdin when none is given
    Chat {
        /// Bot to talk to (defaults to the first active bot)
        #[arg(long)]
        bot: Option<String>,

        /// Send a single prompt and exit
        prompt: Option<String>,
    },

    /// Show or change the local model settings
    Settings {
        /// Chat endpoint URL of the inference server
        #[arg(long)]
        endpoint: Option<String>,

        /// Model name on the inference server
        #[arg(long)]
        model: Option<String>,
    },

    /// Manage the active bots
    Models {
        /// List all bots
        #[arg(long)]
        list: bool,

        /// Make these bots active and save the selection
        #[arg(long, num_args = 1..)]
        activate: Vec<String>,
    },

    /// Show version information
    Version,
}

impl Cli {
    /// Parse CLI arguments from environment
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
