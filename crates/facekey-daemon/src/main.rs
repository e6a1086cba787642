//! facekey Daemon - Main entry point
//!
//! Wires the lock monitor, capture loop, pairing server, and admin IPC
//! together around a single shared state store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use facekey_core::FaceMatcher;
use facekey_daemon::camera::platform_camera;
use facekey_daemon::server::lan_ip;
use facekey_daemon::unlock::platform_injector;
use facekey_daemon::{
    backend, AppState, CaptureLoop, CaptureSettings, DaemonConfig, DaemonEvent, DaemonStatus,
    EventBus, LockMonitor, PairingServer, ServerInfo, StateStore, SystemLockProbe,
    UnlockExecutor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "facekey_daemon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting facekey daemon v{}", env!("CARGO_PKG_VERSION"));

    // Load or create config
    let config_path = std::env::var("FACEKEY_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::config_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("/etc"))
                .join("facekey")
                .join("daemon.json")
        });

    let config = if config_path.exists() {
        DaemonConfig::load(&config_path)?
    } else {
        let config = DaemonConfig::default();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.save(&config_path)?;
        info!("Created default config at {:?}", config_path);
        config
    };

    // Ensure directories exist
    config.ensure_directories()?;

    // Initialize components
    let events = EventBus::new();
    let state = Arc::new(StateStore::open(config.state_path.clone()));
    if !state.has_password() {
        warn!("No unlock password stored yet; run `facekey set-password`");
    }

    let unlocker = Arc::new(UnlockExecutor::new(
        Arc::clone(&state),
        platform_injector(),
        events.clone(),
    ));

    let encoder = backend::load_encoder(&config)?;

    let capture = encoder.clone().map(|encoder| {
        Arc::new(CaptureLoop::new(
            platform_camera(config.camera_index),
            encoder,
            FaceMatcher::new(config.tolerance),
            Arc::clone(&state),
            Arc::clone(&unlocker),
            events.clone(),
            CaptureSettings::from(&config),
        ))
    });

    let mut monitor = LockMonitor::new(
        Box::new(SystemLockProbe),
        capture,
        events.clone(),
        config.poll_interval(),
    );
    let capture_control = monitor.control();
    let status = Arc::new(DaemonStatus::new());

    // Log every event as the default notification sink
    let mut event_rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            info!("Event: {:?}", event);
        }
    });

    // Lock monitor on a dedicated thread; capture runs are spawned from it
    let shutdown = Arc::new(AtomicBool::new(false));
    let monitor_handle = {
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("facekey-lock-monitor".to_string())
            .spawn(move || monitor.run(&shutdown))?
    };

    // Start pairing server; failure leaves face unlock running
    let app = AppState {
        state: Arc::clone(&state),
        encoder,
        unlocker: Arc::clone(&unlocker),
        events: events.clone(),
        max_register_images: config.max_register_images,
    };
    let server_handle = match PairingServer::bind(&config, app).await {
        Ok(server) => {
            let info = ServerInfo {
                addr: server.local_addr()?,
                lan_ip: lan_ip(),
            };
            status.set_server(info);
            events.publish(DaemonEvent::ServerBound {
                addr: info.addr,
                lan_ip: info.lan_ip,
            });
            info!(
                "Pairing page: {}",
                info.pairing_url(state.auth_token().as_str())
            );
            Some(tokio::spawn(async move {
                if let Err(e) = server.run().await {
                    error!("Pairing server error: {}", e);
                }
            }))
        }
        Err(e) => {
            error!("Failed to start pairing server: {}", e);
            events.publish(DaemonEvent::ServerFailed {
                reason: e.to_string(),
            });
            None
        }
    };

    // Start IPC server
    let ipc_server = facekey_daemon::IpcServer::new(
        config.ipc_socket_path.clone(),
        facekey_daemon::ipc::IpcContext {
            state: Arc::clone(&state),
            unlocker: Arc::clone(&unlocker),
            status: Arc::clone(&status),
            capture: capture_control,
            face_unlock: config.face_unlock_enabled,
        },
    );
    let ipc_handle = tokio::spawn(async move {
        if let Err(e) = ipc_server.run().await {
            error!("IPC server error: {}", e);
        }
    });

    info!("Daemon started successfully");

    let server_done = async {
        match server_handle {
            Some(handle) => {
                let _ = handle.await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = server_done => {
            error!("Pairing server exited unexpectedly");
        }
        _ = ipc_handle => {
            error!("IPC server exited unexpectedly");
        }
    }

    info!("Daemon shutting down");

    shutdown.store(true, Ordering::Release);
    let _ = tokio::task::spawn_blocking(move || monitor_handle.join()).await;
    let _ = std::fs::remove_file(&config.ipc_socket_path);

    Ok(())
}

/// Helper module for dirs functionality
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
    }
}
