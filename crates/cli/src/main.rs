//! songbridge - submit music generations and wait for their audio URL
//!
//! Subcommands:
//! - `songbridge generate --prompt <text>` - Submit to the provider, then wait
//! - `songbridge wait <task-id>` - Wait for an already submitted task

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use songbridge_core::callback::CALLBACK_PATH;
use songbridge_core::config::var_or;
use songbridge_core::types::TaskId;
use songbridge_provider::{
    BridgeStatusSource, CompletionWaiter, GenerationRequest, MusicProviderApi, PollConfig,
    ProviderConfig, ProviderStatusSource, StatusSource,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod outcome;

use outcome::Outcome;

#[derive(Parser)]
#[command(name = "songbridge")]
#[command(about = "Submit music generations and wait for the finished track")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a generation request, then wait for the audio URL
    Generate {
        /// Song description (or lyrics in custom mode)
        #[arg(short, long)]
        prompt: String,

        /// Style tags, honoured in custom mode
        #[arg(long)]
        style: Option<String>,

        /// Song title, honoured in custom mode
        #[arg(long)]
        title: Option<String>,

        /// Print the task id and exit without waiting
        #[arg(long)]
        no_wait: bool,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Wait for a previously submitted task
    Wait {
        /// Provider-assigned task id
        task_id: String,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Args)]
struct WaitArgs {
    /// Where to ask for completion status
    #[arg(long, value_enum, default_value_t = Source::Provider)]
    source: Source,

    /// Bridge server root, used with `--source bridge`
    #[arg(long, env = "SONGBRIDGE_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Bearer token for the bridge server, when a gateway in front of it
    /// requires one
    #[arg(long, env = "SONGBRIDGE_TOKEN", hide_env_values = true)]
    server_token: Option<String>,

    /// Delay between status checks in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "5000")]
    interval_ms: u64,

    /// Maximum number of status checks
    #[arg(long, env = "POLL_MAX_ATTEMPTS", default_value = "18")]
    max_attempts: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    /// The provider's record-info endpoint
    Provider,
    /// A running bridge server's status endpoint
    Bridge,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "songbridge_cli=info,songbridge_provider=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            Outcome::Failure.into()
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    match cli.command {
        Commands::Generate {
            prompt,
            style,
            title,
            no_wait,
            wait,
        } => {
            let api = Arc::new(MusicProviderApi::new(
                ProviderConfig::from_env().context("Provider configuration")?,
            ));

            let public_base_url = var_or("PUBLIC_BASE_URL", "http://localhost:3000");
            let callback_url = format!("{}{CALLBACK_PATH}", public_base_url.trim_end_matches('/'));

            let request = GenerationRequest {
                prompt,
                style,
                title,
            };
            let task_id = api
                .submit_generation(&request, &callback_url)
                .await
                .context("Generation request failed")?;
            eprintln!("Submitted task {task_id}");

            if no_wait {
                println!("{task_id}");
                return Ok(Outcome::Success);
            }

            let source = status_source(&wait, Some(api))?;
            wait_for(source, &task_id, &wait).await
        }
        Commands::Wait { task_id, wait } => {
            let task_id = TaskId::parse(task_id)?;
            let source = status_source(&wait, None)?;
            wait_for(source, &task_id, &wait).await
        }
    }
}

/// Build the status source selected by `--source`, reusing `api` when the
/// provider client already exists.
fn status_source(
    args: &WaitArgs,
    api: Option<Arc<MusicProviderApi>>,
) -> Result<Arc<dyn StatusSource>> {
    let source: Arc<dyn StatusSource> = match args.source {
        Source::Provider => {
            let api = match api {
                Some(api) => api,
                None => Arc::new(MusicProviderApi::new(
                    ProviderConfig::from_env().context("Provider configuration")?,
                )),
            };
            Arc::new(ProviderStatusSource::new(api))
        }
        Source::Bridge => Arc::new(
            BridgeStatusSource::new(args.server.as_str()).with_token(args.server_token.clone()),
        ),
    };
    Ok(source)
}

async fn wait_for(
    source: Arc<dyn StatusSource>,
    task_id: &TaskId,
    args: &WaitArgs,
) -> Result<Outcome> {
    let config = PollConfig::new(Duration::from_millis(args.interval_ms), args.max_attempts);
    let waiter = CompletionWaiter::new(source, config);

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl-C, cancelling wait");
                cancel.cancel();
            }
        }
    });

    eprintln!(
        "Waiting for {task_id} (up to {} checks, {} ms apart)",
        config.max_attempts, args.interval_ms
    );
    let result = waiter.wait(task_id, &cancel).await;
    ctrl_c.abort();

    match result {
        Ok(audio_url) => {
            println!("{audio_url}");
            Ok(Outcome::Success)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(Outcome::from(&e))
        }
    }
}
