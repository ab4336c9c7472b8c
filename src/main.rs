use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use gallery_courier::application::services::ManifestSynchronizer;
use gallery_courier::application::{PipelineDeps, PublicationPipeline, PublicationWorker, TriggerListener};
use gallery_courier::infrastructure::{
    AppConfig, CliArgs, CodecPreviewGenerator, ConfigStore, DiscordRestClient, FtpTransferSession,
    GatewayClient, GatewayClientConfig, HttpFetcher,
};
use gallery_courier::presentation::{BotRuntime, ServeEnd, ShutdownListener};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if config.production
        && let Some(log_path) = config.effective_log_path()
    {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let args = CliArgs::parse();
    let store = ConfigStore::new()?;
    let mut config = store.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    config.validate().wrap_err("invalid configuration")?;
    Ok(config)
}

async fn build_runtime(config: &AppConfig) -> Result<BotRuntime> {
    config
        .cache
        .ensure()
        .wrap_err("failed to create local cache directories")?;

    let ftp = FtpTransferSession::connect(config.ftp.settings())
        .await
        .wrap_err("failed to open FTP session")?;

    let fetcher = Arc::new(HttpFetcher::new(config.http.timeout())?);
    let manifest = ManifestSynchronizer::new(
        fetcher.clone(),
        config.manifest.url.clone(),
        config.cache.manifest_path.clone(),
        config.remote.clone(),
    );
    let deps = PipelineDeps {
        fetcher,
        previews: Arc::new(CodecPreviewGenerator::new(config.preview)),
        manifest,
        layout: config.remote.clone(),
        cache: config.cache.clone(),
        order: config.publish.commit_order(),
    };
    let pipeline = PublicationPipeline::new(deps, Box::new(ftp));
    let (worker, worker_task) = PublicationWorker::spawn(pipeline, config.publish.worker_config());

    let owner_id = config
        .discord
        .owner_id
        .ok_or_else(|| eyre!("no owner configured"))?;
    let chat = Arc::new(DiscordRestClient::new(config.discord.token.clone())?);
    let listener = TriggerListener::new(
        chat,
        worker.clone(),
        owner_id,
        config.discord.trigger_emoji.clone(),
    );

    Ok(BotRuntime::new(listener, worker, worker_task))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_logging(&config)?;

    info!(version = gallery_courier::VERSION, "Starting {}", gallery_courier::NAME);

    let mut runtime = build_runtime(&config).await?;

    let mut gateway = GatewayClient::new(
        GatewayClientConfig::default().with_presence(config.discord.presence.clone()),
    );
    let mut events = gateway.connect(&config.discord.token)?;

    let mut signals = ShutdownListener::install().wrap_err("failed to install signal handlers")?;
    let end = runtime
        .serve(&mut events, async move {
            signals.recv().await;
        })
        .await;

    gateway.disconnect();
    runtime.drain().await;
    info!("Stopped");

    match end {
        ServeEnd::Shutdown => Ok(()),
        ServeEnd::GatewayClosed(Some(error)) => Err(eyre!("gateway stopped: {error}")),
        ServeEnd::GatewayClosed(None) => Err(eyre!("gateway connection lost")),
    }
}
