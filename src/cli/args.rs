use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::constants::TABLE_PREVIEW_LIMIT;

#[derive(Parser, Debug)]
#[command(name = "flightchat")]
#[command(version)]
#[command(about = "Ask questions about your uploaded flight-log data", long_about = None)]
pub struct Cli {
    /// Base URL of the analysis service (overrides config and FLIGHTCHAT_BASE_URL)
    #[arg(short, long, global = true)]
    pub base_url: Option<String>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Reuse an existing session id (as printed by `upload`) instead of generating one
    #[arg(short, long, global = true)]
    pub session_id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        prompt: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output_format: OutputFormat,
    },
    /// Clear the server-side conversation for the session
    Clear,
    /// Show which data tables the service holds for the session
    Context,
    /// Check that the analysis service is reachable
    Status,
    /// Summarize the parsed data uploaded under the session
    Data,
    /// Preview rows from one data table
    Table {
        /// Table name (e.g. GPS)
        name: String,

        /// Maximum number of rows to fetch
        #[arg(short, long, default_value_t = TABLE_PREVIEW_LIMIT)]
        limit: usize,
    },
    /// Upload one message type of parsed flight-log data
    Upload {
        /// JSON file mapping field name -> { row index -> value }
        file: PathBuf,

        /// Log message type the data belongs to (e.g. GPS, ATT, BAT)
        #[arg(short = 't', long)]
        message_type: String,
    },
    /// Write a default configuration file
    Init,
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
}
