//! CLI binary for voxloop.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use voxloop::device::CloudDeviceController;
use voxloop::llm::ApiCompletion;
use voxloop::stt::ConsoleRecognizer;
use voxloop::tts::ConsoleSynthesizer;
use voxloop::{PipelineCoordinator, VoxConfig};

/// voxloop: hands-free voice command loop.
#[derive(Parser)]
#[command(name = "voxloop", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write daily-rotated log files into this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Start the voice command loop.
    Run,

    /// Print the effective configuration as TOML.
    PrintConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_dir.as_deref())?;

    let mut config = load_config(cli.config.as_deref())?;
    config.apply_env_overrides();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::PrintConfig => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Stderr output always; a rolling file as well when `log_dir` is set.
/// `RUST_LOG` overrides the default filter.
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("voxloop=info,reqwest=warn,hyper=warn"));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("voxloop")
                .filename_suffix("log")
                .build(dir)?;
            Some(fmt::layer().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Explicit path must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> anyhow::Result<VoxConfig> {
    if let Some(path) = path {
        return Ok(VoxConfig::from_file(path)?);
    }
    let default_path = VoxConfig::default_config_path();
    if default_path.is_file() {
        info!("loading config from {}", default_path.display());
        Ok(VoxConfig::from_file(&default_path)?)
    } else {
        Ok(VoxConfig::default())
    }
}

async fn run(config: VoxConfig) -> anyhow::Result<()> {
    println!("voxloop v{}", env!("CARGO_PKG_VERSION"));

    let wake_phrase = config.conversation.wake_phrase.clone();
    let stop_phrase = config
        .barge_in
        .stop_phrases
        .first()
        .cloned()
        .unwrap_or_default();

    let recognizer = ConsoleRecognizer::stdin()?;
    let synth = ConsoleSynthesizer::stdout(&config.tts);
    let completion = Arc::new(ApiCompletion::new(&config.llm)?);
    let device = Arc::new(CloudDeviceController::new(&config.device)?);
    if let Err(e) = device.connect().await {
        warn!("device API login failed, retrying on first command: {e}");
    }

    let pipeline = PipelineCoordinator::new(config, Box::new(synth), completion, device);
    let cancel = pipeline.cancel_token();

    // Handle Ctrl+C
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel_clone.cancel();
        }
    });

    println!(
        "\nType what you would say. Start with \"{wake_phrase}\"; type \"{stop_phrase}\" \
         to cut a reply short. Press Ctrl+C to quit.\n"
    );

    pipeline.run(Box::new(recognizer)).await?;

    Ok(())
}
