pub mod models;
pub mod services;
pub mod subsystems;
pub mod traits;
pub mod truncate;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use crate::services::digests::DigestService;
use crate::services::reddit::RedditClient;
use crate::services::render::Renderer;
use crate::services::settings::{AppConfig, DEFAULT_PORT, LogConfig, load_config};
use crate::services::store::FileSystemDigestStore;
use crate::subsystems::{AppState, SchedulerSubsystem, ServerSubsystem};
use crate::traits::digest_store::DigestStore;

fn io_err(msg: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, msg.to_string())
}

fn load_app_config(path: &str) -> std::io::Result<AppConfig> {
    load_config(path).map_err(|e| io_err(format!("Failed to load {}: {}", path, e)))
}

/// Initialize structured logging (default to info if RUST_LOG not set).
///
/// With `log.dir` configured, output goes to a daily rolling file; the
/// returned guard must be held until exit so buffered lines get flushed.
pub fn init_logging(log: Option<&LogConfig>) -> Option<WorkerGuard> {
    let log_spec = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_spec))
        .with_target(false)
        .compact();

    match log.and_then(|l| l.dir.as_deref()) {
        Some(dir) => {
            let prefix = log.and_then(|l| l.file_prefix.as_deref()).unwrap_or("mailshine.log");
            let appender = tracing_appender::rolling::daily(dir, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = builder.with_writer(writer).with_ansi(false).try_init();
            Some(guard)
        }
        None => {
            let _ = builder.try_init();
            None
        }
    }
}

fn digest_store(cfg: &AppConfig) -> Arc<FileSystemDigestStore> {
    Arc::new(FileSystemDigestStore::builder().dir(cfg.store_dir()).build())
}

fn digest_service(cfg: &AppConfig, store: Arc<dyn DigestStore>) -> std::io::Result<DigestService> {
    let fetcher = RedditClient::from_config(&cfg.reddit).map_err(io_err)?;
    Ok(DigestService::builder()
        .fetcher(Arc::new(fetcher))
        .store(store)
        .feeds(cfg.feeds.clone())
        .build())
}

/// `--init`: create the store layout and exit
pub async fn run_init(path: &str) -> std::io::Result<()> {
    let cfg = load_app_config(path)?;
    let _guard = init_logging(cfg.log.as_ref());

    digest_store(&cfg).initialize().await.map_err(io_err)?;
    info!(dir = %cfg.store_dir(), "store initialized");
    Ok(())
}

/// `--generate`: create one digest for every feed and exit
pub async fn run_generate(path: &str) -> std::io::Result<()> {
    let cfg = load_app_config(path)?;
    let _guard = init_logging(cfg.log.as_ref());

    let store = digest_store(&cfg);
    store.initialize().await.map_err(io_err)?;
    let service = digest_service(&cfg, store)?;

    match service.create_all_digests().await {
        Ok(created) => {
            for d in &created {
                info!(feed = %d.feed_name, id = %d.id, title = %d.title, "generated digest");
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "digest generation failed");
            Err(io_err(format!("{:#}", e)))
        }
    }
}

/// High-level entrypoint: load config, init logging, run scheduler and server
pub async fn run_with_config_path(path: &str, port: Option<u16>) -> std::io::Result<()> {
    let cfg = load_app_config(path)?;
    let _guard = init_logging(cfg.log.as_ref());
    run_service(cfg, port).await
}

pub async fn run_service(cfg: AppConfig, port: Option<u16>) -> std::io::Result<()> {
    info!(feeds = cfg.feeds.len(), "mailshine starting");

    let store = digest_store(&cfg);
    store.initialize().await.map_err(io_err)?;

    let scheduler_enabled = cfg.schedule.as_ref().and_then(|s| s.enabled).unwrap_or(true);
    let scheduler = if scheduler_enabled {
        let service = digest_service(&cfg, store.clone())?;
        Some(SchedulerSubsystem::from_config(cfg.schedule.as_ref(), service).map_err(io_err)?)
    } else {
        info!("scheduler disabled");
        None
    };

    let server_cfg = cfg.server.as_ref();
    let server_enabled = server_cfg.and_then(|s| s.enabled).unwrap_or(true);
    let server = if server_enabled {
        let host = server_cfg.and_then(|s| s.host.clone()).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = port.or(server_cfg.and_then(|s| s.port)).unwrap_or(DEFAULT_PORT);
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| io_err(format!("invalid listen address {}:{}: {}", host, port, e)))?;
        let renderer = Renderer::from_config(&cfg).map_err(io_err)?;
        let state = AppState::builder()
            .store(store.clone())
            .renderer(Arc::new(renderer))
            .feeds(Arc::new(cfg.feeds.clone()))
            .build();
        Some(
            ServerSubsystem::builder()
                .state(state)
                .addr(addr)
                .maybe_static_dir(server_cfg.and_then(|s| s.static_dir.clone()))
                .build(),
        )
    } else {
        info!("HTTP server disabled");
        None
    };

    Toplevel::new(|s| async move {
        if let Some(scheduler) = scheduler {
            s.start(SubsystemBuilder::new("Scheduler", move |h| scheduler.run(h)));
        }
        if let Some(server) = server {
            s.start(SubsystemBuilder::new("Server", move |h| server.run(h)));
        }
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(1000))
    .await
    .map_err(io_err)
}
