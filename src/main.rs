use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use marquee::MovieDb;
use marquee::access_log::AccessLog;
use marquee::clock::SystemClock;
use marquee::config::Config;
use marquee::enrich::Enricher;
use marquee::pdf::PdfRenderer;
use marquee::server::MovieServer;
use marquee::service::MovieService;

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tokio::runtime::Builder::new_multi_thread()
    .worker_threads(config.worker_threads())
    .enable_all()
    .build()
    .context("failed to build tokio runtime")?
    .block_on(async_main(config))
}

async fn async_main(config: Config) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
    .with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,marquee=info")),
    )
    .with_target(false)
    .with_level(true)
    .init();

    info!("--- Marquee Movie API ---");
    info!("Data file: {}", config.data_file.display());
    info!("Access log: {}", config.access_log.display());
    info!("Worker threads: {}", config.worker_threads());

    let db = MovieDb::open(&config.data_file)
    .with_context(|| format!("failed to open {}", config.data_file.display()))?;

    let service = MovieService::new(
        Arc::new(db),
        Arc::new(SystemClock),
        Enricher::new(config.loopback_placeholder.clone()),
        Arc::new(PdfRenderer),
    );
    let server = MovieServer::new(service, AccessLog::new(&config.access_log), config.body_limit);

    server
    .run(config.addr)
    .await
    .with_context(|| format!("failed to serve on {}", config.addr))
}
