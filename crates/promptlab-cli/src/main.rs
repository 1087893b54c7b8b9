use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use promptlab_core::{GenerationMode, TaskKind};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "promptlab")]
#[command(about = "PromptLab - Summarize • Transform • Expand • Infer • Chat", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of config.toml
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Generation backend (remote or local)
    #[arg(long, global = true)]
    pub backend: Option<GenerationMode>,

    /// Model identifier sent to the backend
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Maximum number of calls per request
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Path to config.toml (defaults to ~/.config/promptlab/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TaskArgs {
    /// Task option as key=value (e.g. -o style="3 bullet points"); repeatable
    #[arg(short = 'o', long = "option", value_parser = commands::task::parse_option)]
    pub options: Vec<(String, String)>,

    /// Input text; read from stdin when omitted
    pub text: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize text (options: style)
    Summarize(TaskArgs),
    /// Fix grammar, tone and formatting (options: tone, formatting, grammar_fix, translate_to)
    Transform(TaskArgs),
    /// Expand short notes into a professional email (options: audience, objective, extras)
    Expand(TaskArgs),
    /// Infer sentiment, topics and intent
    Infer(TaskArgs),
    /// Interactive chat with memory
    Chat,
    /// Inspect or create configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write default config.toml and a secret.json template if missing
    Init,
    /// Print the effective configuration
    Show,
    /// Print config file locations
    Path,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // .env may carry OPENAI_API_KEY
    dotenvy::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Summarize(args) => commands::task::run(TaskKind::Summarize, &cli.global, args).await?,
        Commands::Transform(args) => commands::task::run(TaskKind::Transform, &cli.global, args).await?,
        Commands::Expand(args) => commands::task::run(TaskKind::Expand, &cli.global, args).await?,
        Commands::Infer(args) => commands::task::run(TaskKind::Infer, &cli.global, args).await?,
        Commands::Chat => {
            commands::chat::run(&cli.global).await?;
            ExitCode::SUCCESS
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Init => commands::config::init(&cli.global)?,
                ConfigAction::Show => commands::config::show(&cli.global)?,
                ConfigAction::Path => commands::config::path(&cli.global)?,
            }
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
