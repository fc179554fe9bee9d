use std::sync::Arc;

use tracing::{error, info};

use healthgate::config::Config;
use healthgate::health::Registry;
use healthgate::server::{AppState, Server};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env().map_err(|e| {
        eprintln!("Invalid configuration: {}", e);
        e
    })?;

    healthgate::logging::init(&config.logging);

    info!("Starting healthgate {}", healthgate::VERSION);
    config.log_summary();

    // Probes are I/O bound; one thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Arc::new(Registry::new());
    let state = AppState::from_config(&config, registry).map_err(|e| {
        error!("Failed to initialize health engine: {}", e);
        e
    })?;

    info!("{} probe(s) registered", state.registry.len());

    let server = Server::new(config.server.clone(), state);
    run_server(server).await
}

async fn run_server(server: Server) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let run = server.run();
    tokio::pin!(run);

    // Handle shutdown gracefully
    tokio::select! {
        result = &mut run => return result,
        _ = shutdown_signal() => {
            info!("Shutting down...");
        }
    }

    server.trigger_shutdown();
    run.await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
