//! mumo: Mumble moderator
//!
//! Main entry point that loads the configuration, starts the module
//! manager and keeps it connected to the voice server.

mod cli;

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use mumo_core::config::{AppConfig, LoggingConfig, TransportConfig};
use mumo_core::error::AppError;
use mumo_core::result::AppResult;
use mumo_plugin::{ConnectionSupervisor, Manager, ModuleCatalog};
use mumo_transport::MetaProxy;
use mumo_transport::mock::MockMeta;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.ini) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Fatal error, could not load config file from '{}'", cli.ini.display());
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.log, cli.quiet) {
        eprintln!("Fatal error, {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config, cli.mock).await {
        tracing::error!("Moderator error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig, quiet: bool) -> AppResult<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true);

    let file = match &config.file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::configuration(format!("could not open logfile '{}': {}", path, e)))?,
        ),
        None => None,
    };

    match (config.format.as_str(), file) {
        ("json", Some(file)) => builder.json().with_writer(Mutex::new(file)).init(),
        ("json", None) => builder.json().with_writer(std::io::stderr).init(),
        (_, Some(file)) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        (_, None) => builder.pretty().with_writer(std::io::stderr).init(),
    }
    Ok(())
}

/// Main moderator run function
async fn run(config: AppConfig, mock: Option<i32>) -> AppResult<()> {
    tracing::info!("Starting mumble moderator v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Voice server transport ───────────────────────────
    // Opened before any module starts, so a missing transport stops
    // startup without skipping module `on_stop` hooks.
    let meta = connect_transport(&config.transport, mock)?;

    // ── Step 2: Module manager ───────────────────────────────────
    tracing::debug!("Initializing manager");
    let mut catalog = ModuleCatalog::new();
    mumo_modules::register_builtin(&mut catalog);
    tracing::info!("Built-in modules: {}", catalog.names().join(", "));

    let mut manager = Manager::new(config.modules.clone(), catalog);
    manager.start()?;
    let handle = manager.handle();

    // ── Step 3: Load and start modules ───────────────────────────
    let modules = handle.clone();
    let started = blocking(move || {
        let loaded = modules.load_modules(None)?;
        modules.start_modules(Some(loaded))
    })
    .await??;
    tracing::info!("Started modules: [{}]", started.join(", "));

    // ── Step 4: Voice server connection ──────────────────────────
    let supervisor = Arc::new(ConnectionSupervisor::new(
        meta,
        handle.clone(),
        config.murmur.clone(),
        config.transport.watchdog_interval(),
    ));

    let attach = Arc::clone(&supervisor);
    if !blocking(move || attach.attach_callbacks()).await? {
        tracing::warn!("Voice server not reachable yet, the watchdog keeps retrying");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watchdog = Arc::clone(&supervisor).spawn_watchdog(shutdown_rx);

    // ── Step 5: Wait for shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping modules...");
    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(10), watchdog).await;

    let clean = blocking(move || manager.shutdown(false)).await?;
    if !clean {
        tracing::warn!("Manager did not stop in time");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Run blocking manager work off the async workers.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("Blocking task failed: {}", e)))
}

/// Open the voice server transport.
///
/// Only the in-memory transport ships with this binary; an RPC transport
/// plugs in through the `MetaProxy` trait.
fn connect_transport(config: &TransportConfig, mock: Option<i32>) -> AppResult<Arc<dyn MetaProxy>> {
    match mock {
        Some(servers) => {
            tracing::info!("Using in-memory voice server with {} virtual servers", servers);
            Ok(Arc::new(MockMeta::with_servers(servers)))
        }
        None => Err(AppError::transport(format!(
            "No transport available for {}, run with --mock <N> for an in-memory voice server",
            config.endpoint()
        ))),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
