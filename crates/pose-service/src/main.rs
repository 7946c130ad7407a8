use anyhow::Result;
use pose_service::api;
use pose_service::backend::synthetic::{SyntheticConfig, SyntheticPoseFactory};
use pose_service::{PoseServiceConfig, PoseServiceState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_with_service("pose-service");

    info!("Starting Pose Service...");

    let config = PoseServiceConfig::from_env()?;
    info!(
        "Pose Service configuration: bind={}, node_id={}, core={}",
        config.bind_addr,
        config.node_id,
        common::VERSION
    );

    let factory = Arc::new(SyntheticPoseFactory::new(SyntheticConfig {
        simulated_delay_ms: config.synthetic_delay_ms,
        ..SyntheticConfig::default()
    }));

    let state =
        PoseServiceState::with_base_config(config.node_id.clone(), factory, config.detector);

    let app = api::router(state.clone());

    info!("Binding to {}", config.bind_addr);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Pose Service listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

async fn shutdown_signal(state: PoseServiceState) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
    if let Err(e) = state.shutdown().await {
        tracing::error!("Error during shutdown: {}", e);
    }
}
