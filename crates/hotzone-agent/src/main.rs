//! hotzone agent: entry point.
//!
//! Watches the pointer and asks the streaming studio to trigger a hotkey when
//! the pointer enters the left or right edge band of the trigger monitor.
//!
//! # Usage
//!
//! ```text
//! hotzone-agent [OPTIONS]
//!
//! Options:
//!   --config   <PATH>  TOML configuration file
//!   --endpoint <URL>   Studio WebSocket URL [default: ws://localhost:4455]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable           | Default                                 | Description               |
//! |--------------------|-----------------------------------------|---------------------------|
//! | `HOTZONE_CONFIG`   | `$XDG_CONFIG_HOME/hotzone/config.toml`  | Configuration file        |
//! | `HOTZONE_ENDPOINT` | value from the config file              | Studio WebSocket URL      |
//! | `RUST_LOG`         | `[logging] level` from the config file  | Log filter                |
//!
//! # Architecture overview
//!
//! ```text
//!  zone-monitor thread                    tokio runtime
//!  ───────────────────                    ─────────────
//!  X11 pointer ─► ZoneMonitor ──try_send──► SessionManager ◄── ReconnectSupervisor
//!                                               │
//!                                               ▼
//!                                  WebSocket (ws://localhost:4455)
//!                                               │
//!                                               ▼
//!                                         streaming studio
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hotzone_agent::application::reconnect::ReconnectSupervisor;
use hotzone_agent::application::session_manager::SessionManager;
use hotzone_agent::application::transport::Connector;
use hotzone_agent::application::zone_monitor::{CommandSink, ZoneMonitorConfig};
use hotzone_agent::infrastructure::config::{load_config, AgentConfig};
use hotzone_agent::infrastructure::websocket::WebSocketConnector;
use hotzone_core::RegionTable;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Pointer-zone hotkey agent.
#[derive(Debug, Parser)]
#[command(
    name = "hotzone-agent",
    about = "Triggers studio hotkeys when the pointer reaches a screen edge",
    version
)]
struct Cli {
    /// TOML configuration file.
    ///
    /// When omitted the platform config file is used if it exists, otherwise
    /// the built-in defaults.
    #[arg(long, env = "HOTZONE_CONFIG")]
    config: Option<PathBuf>,

    /// Studio WebSocket URL, overriding `[connection] endpoint`.
    #[arg(long, env = "HOTZONE_ENDPOINT")]
    endpoint: Option<String>,
}

impl Cli {
    /// Loads the configuration file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    fn into_agent_config(self) -> anyhow::Result<AgentConfig> {
        let mut config = load_config(self.config.as_deref()).with_context(|| match &self.config {
            Some(path) => format!("failed to load config from {}", path.display()),
            None => "failed to load platform config".to_string(),
        })?;
        if let Some(endpoint) = self.endpoint {
            config.connection.endpoint = endpoint;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_agent_config()?;

    // RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let regions = config.region_table().context("invalid configuration")?;
    for (a, b) in regions.overlapping_pairs() {
        warn!("regions '{a}' and '{b}' overlap; '{a}' wins where they do");
    }

    info!(
        endpoint = %config.connection.endpoint,
        trigger = %config.monitor.trigger_region,
        "hotzone agent starting"
    );

    let connector: Arc<dyn Connector> = Arc::new(WebSocketConnector::new(config.connect_timeout()));
    let manager = Arc::new(SessionManager::new(connector, config.session_config()));

    let running = Arc::new(AtomicBool::new(true));
    let sink: Arc<dyn CommandSink> = Arc::clone(&manager) as Arc<dyn CommandSink>;
    let monitor = spawn_zone_monitor(
        Handle::current(),
        regions,
        config.zone_monitor_config(),
        sink,
        Arc::clone(&running),
    )
    .await?;

    let mut supervisor = tokio::spawn(
        ReconnectSupervisor::new(Arc::clone(&manager), config.reconnect_policy()).run(),
    );

    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        },
        result = &mut supervisor => {
            if let Err(e) = result {
                error!("reconnect supervisor stopped: {e}");
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    supervisor.abort();
    manager.discard().await;

    match tokio::task::spawn_blocking(move || monitor.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => error!("zone monitor thread panicked"),
        Err(e) => error!("failed to join zone monitor thread: {e}"),
    }

    info!("hotzone agent stopped");
    Ok(())
}

// ── Zone monitor thread ───────────────────────────────────────────────────────

/// Starts the zone monitor on its own thread.
///
/// The X11 display connection is opened on that thread because it must not
/// move between threads.  Returns once the pointer source is open.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned or the pointer source
/// cannot be opened.
#[cfg(target_os = "linux")]
async fn spawn_zone_monitor(
    runtime: Handle,
    regions: RegionTable,
    config: ZoneMonitorConfig,
    sink: Arc<dyn CommandSink>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<()>> {
    use hotzone_agent::application::zone_monitor::ZoneMonitor;
    use hotzone_agent::infrastructure::pointer::NativePointerSource;

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let thread = std::thread::Builder::new()
        .name("zone-monitor".to_string())
        .spawn(move || match NativePointerSource::open() {
            Ok(pointer) => {
                let _ = ready_tx.send(Ok(()));
                ZoneMonitor::new(pointer, regions, config, sink).run_blocking(&runtime, &running);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        })
        .context("failed to spawn zone monitor thread")?;

    ready_rx
        .await
        .context("zone monitor thread exited during startup")?
        .context("failed to open pointer source")?;
    Ok(thread)
}

#[cfg(not(target_os = "linux"))]
async fn spawn_zone_monitor(
    _runtime: Handle,
    _regions: RegionTable,
    _config: ZoneMonitorConfig,
    _sink: Arc<dyn CommandSink>,
    _running: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<()>> {
    anyhow::bail!("no native pointer source is available on this platform")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
