//! Regwise CLI
//!
//! Main entry point for the regwise command-line tool.
//! Answers regulatory-compliance questions from an indexed document set.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ExamplesCommand, PromptsCommand};
use regwise_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppResult,
};
use std::path::PathBuf;

/// Regwise CLI - regulatory-compliance answers with citations
#[derive(Parser, Debug)]
#[command(name = "regwise")]
#[command(about = "Regulatory-compliance answers from your document index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "REGWISE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "REGWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Chat model name
    #[arg(short, long, global = true, env = "REGWISE_CHAT_MODEL")]
    model: Option<String>,

    /// Azure OpenAI chat deployment
    #[arg(short, long, global = true, env = "REGWISE_CHAT_DEPLOYMENT")]
    deployment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a compliance question
    Ask(AskCommand),

    /// Print example questions
    Examples(ExamplesCommand),

    /// List prompt definitions in the workspace
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Flags take precedence over the environment for locating config
    let config = match &cli.workspace {
        Some(workspace) => AppConfig::load_from_workspace(workspace, cli.config.clone())?,
        None if cli.config.is_some() => {
            AppConfig::load_from_workspace(&AppConfig::default().workspace, cli.config.clone())?
        }
        None => AppConfig::load()?,
    };

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.model,
        cli.deployment,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("Regwise CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Search index: {}", config.search.index);
    tracing::debug!("Chat model: {}", config.openai.chat_model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Examples(_) => "examples",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Examples(cmd) => cmd.execute(),
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
