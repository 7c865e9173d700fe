use crate::config::Protocol;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repo-digest")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "AI-powered GitHub repository analyzer",
    long_about = "repo-digest fetches a GitHub repository's metadata and README and asks \
                  Gemini for a structured JSON analysis: summary, features, use cases and \
                  notable statistics. Run it once from the command line or as an HTTP service."
)]
pub struct Cli {
    /// Path to config file (default: ~/.config/repo-digest/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Gemini model to use
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// How to call Gemini
    #[arg(long, value_enum, global = true)]
    pub protocol: Option<Protocol>,

    /// Summarization timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze one repository and print the result
    Analyze {
        /// Repository URL or owner/repo shorthand
        reference: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides bind_addr)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,

        /// Include error details in 500 responses
        #[arg(long)]
        dev: bool,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}
