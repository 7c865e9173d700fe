mod ai;
mod cli;
mod config;
mod document;
mod error;
mod github;
mod logging;
mod orchestrator;
mod server;

use clap::Parser;
use cli::{Cli, Commands, OutputFormat};
use config::Config;
use error::{ErrorKind, RepoDigestError, Result};
use github::reference::resolve;
use indicatif::{ProgressBar, ProgressStyle};
use orchestrator::Orchestrator;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        if e.kind() == ErrorKind::MissingCredential {
            eprintln!("\nPlease either:");
            eprintln!("  1. Set the GEMINI_API_KEY environment variable");
            eprintln!("  2. Pass --api-key");
            eprintln!("  3. Add gemini_api_key to your config file");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { force } = cli.command {
        return init_config(cli.config.as_deref(), force);
    }

    let config = Config::load_or_default(cli.config.as_deref())?.apply_env();
    let config = apply_cli_overrides(config, &cli);
    config.validate()?;

    match &cli.command {
        Commands::Analyze { reference, format } => run_analysis(&config, reference, *format).await,
        Commands::Serve { .. } => run_server(&config).await,
        Commands::Config => {
            let toml_str = toml::to_string_pretty(&config.redacted())?;
            println!("Current configuration:\n");
            println!("{}", toml_str);
            Ok(())
        }
        Commands::Init { .. } => Ok(()),
    }
}

async fn run_analysis(config: &Config, input: &str, format: OutputFormat) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    let reference = resolve(input);
    let label = reference
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| input.to_string());

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Analyzing {}...", label));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = orchestrator.analyze(input).await;
    spinner.finish_and_clear();
    let response = result?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Markdown => {
            print!("{}", response.ai_summary.to_markdown(&label));
            if let Some(reference) = reference {
                println!("\n<{}>", reference.html_url());
            }
        }
    }

    Ok(())
}

async fn run_server(config: &Config) -> Result<()> {
    if config.api_key().is_none() {
        warn!("no Gemini API key configured; repository analysis requests will fail");
    }
    if config.development {
        warn!("development mode: error details are included in responses");
    }

    let orchestrator = Arc::new(Orchestrator::from_config(config)?);
    server::serve(&config.bind_addr, orchestrator).await
}

fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    if config_path.exists() && !force {
        return Err(RepoDigestError::config(format!(
            "Config file already exists at: {} (use --force to overwrite)",
            config_path.display()
        )));
    }

    Config::create_default_at(&config_path)?;
    println!("✓ Created config file at: {}", config_path.display());
    println!("\nTo authenticate with Gemini, either:");
    println!("  1. Set the GEMINI_API_KEY environment variable");
    println!("  2. Add gemini_api_key to the config file:");
    println!("     gemini_api_key = \"YOUR_KEY_HERE\"");
    Ok(())
}

fn apply_cli_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(ref key) = cli.api_key {
        config.gemini_api_key = Some(key.clone());
    }

    if let Some(ref model) = cli.model {
        config.model = model.clone();
    }

    if let Some(protocol) = cli.protocol {
        config.protocol = protocol;
    }

    if let Some(timeout) = cli.timeout {
        config.summary_timeout_secs = timeout;
    }

    if let Commands::Serve { ref bind, dev } = cli.command {
        if let Some(bind) = bind {
            config.bind_addr = bind.clone();
        }
        if dev {
            config.development = true;
        }
    }

    config
}
