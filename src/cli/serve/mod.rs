//! Serve command - HTTP API plus the background key scheduler

use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api::{create_router_with_metrics, AppState};
use crate::config::AppConfig;
use crate::infrastructure::observability::init_metrics;
use crate::infrastructure::scheduler::Scheduler;

/// Run the server until Ctrl+C or SIGTERM
pub async fn run() -> anyhow::Result<ExitCode> {
    let config = super::load_config()?;
    let schedule = config.schedule_config()?;

    let metrics = init_metrics(&config.metrics);
    let engine = crate::create_engine(&config).await?;

    // The pool must hold keys before the first request is answered
    let scheduler = Scheduler::new(engine.clone(), schedule);
    scheduler.bootstrap().await?;

    let handle = if config.scheduler.enabled {
        Some(scheduler.start())
    } else {
        info!("Key scheduler disabled");
        None
    };

    let app = create_router_with_metrics(AppState::new(engine), metrics, &config.metrics.path);
    let served = serve(app, &config).await;

    if let Some(handle) = handle {
        handle.stop().await;
    }

    served?;
    info!("Server shutdown complete");

    Ok(ExitCode::SUCCESS)
}

async fn serve(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr = build_socket_addr(config)?;
    let listener = TcpListener::bind(addr).await?;
    info!("Starting key server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}
