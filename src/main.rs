use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use easel::api::{ApiServer, ApiState};
use easel::dispatch::{Dispatcher, ForwardedCommand, HttpDispatcher, LocalDispatcher};
use easel::model::TitanImageGenerator;
use easel::slack::SlackClient;
use easel::{Config, Worker};

/// Easel - Slack text-to-image relay
#[derive(Parser)]
#[command(name = "easel", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log without colors or timestamps (for hosted log collectors)
    #[arg(long, env = "EASEL_PLAIN_LOGS", global = true)]
    plain_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the Slack webhook and worker endpoints
    Serve {
        /// Port to listen on
        #[arg(long, env = "EASEL_PORT", default_value = "3000")]
        port: u16,
    },
    /// Run a single forwarded command and exit
    Work {
        /// Command JSON (`{"channel_id", "user_id", "message"}`); read from stdin if omitted
        payload: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,easel=info",
        1 => "info,easel=debug",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if cli.plain_logs {
        subscriber.with_ansi(false).without_time().init();
    } else {
        subscriber.init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Serve { port } => serve(config, port).await,
        Command::Work { payload } => work(config, payload).await,
    }
}

async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let signing_secret = config.signing_secret()?;

    let worker = match config.slack.bot_token.clone() {
        Some(token) => Some(Arc::new(build_worker(&config, token).await)),
        None => None,
    };

    let dispatcher: Arc<dyn Dispatcher> = if let Some(url) = &config.worker.url {
        tracing::info!(url = %url, "forwarding commands to remote worker");
        Arc::new(HttpDispatcher::new(
            url.clone(),
            config.worker.token.clone(),
        )?)
    } else {
        let worker = worker
            .clone()
            .context("SLACK_BOT_TOKEN is required unless EASEL_WORKER_URL is set")?;
        tracing::info!("running commands in-process");
        Arc::new(LocalDispatcher::new(worker))
    };

    tracing::info!(
        port,
        model_id = %config.model.model_id,
        max_request_age = ?config.slack.max_request_age,
        "starting easel"
    );

    let state = Arc::new(ApiState {
        signing_secret,
        max_request_age: config.slack.max_request_age,
        dispatcher,
        worker,
        worker_token: config.worker.token.clone(),
    });

    ApiServer::new(state, port).run().await?;

    Ok(())
}

async fn work(config: Config, payload: Option<String>) -> anyhow::Result<()> {
    let payload = match payload {
        Some(payload) => payload,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read command from stdin")?;
            buf
        }
    };

    let command: ForwardedCommand =
        serde_json::from_str(&payload).context("invalid command payload")?;

    let worker = build_worker(&config, config.bot_token()?).await;
    let outcome = worker.run(&command).await;

    tracing::info!(channel = %command.channel_id, ?outcome, "worker finished");
    Ok(())
}

async fn build_worker(config: &Config, bot_token: SecretString) -> Worker {
    let slack = SlackClient::new(bot_token).with_api_url(&config.slack.api_url);
    let generator =
        TitanImageGenerator::from_env(config.model.region.clone(), config.model.model_id.clone())
            .await;
    Worker::new(slack, Arc::new(generator))
}
