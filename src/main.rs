use std::sync::Arc;

use anyhow::Context;
use tokio::{signal, sync::mpsc};
use tracing::info;

use stateset_receiving as receiving;
use stateset_receiving::{
    seed::SeedData,
    services::{
        blind_mode::SystemConfiguration, locations::InMemoryLocationRegistry,
        products::InMemoryProductCatalog,
    },
    Collaborators,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = receiving::config::load_config().context("failed to load configuration")?;
    receiving::config::init_tracing(&cfg.log_level, cfg.log_json);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = Arc::new(receiving::events::EventSender::new(event_tx));
    tokio::spawn(receiving::events::process_events(event_rx, Vec::new()));

    // Reference data for the in-memory collaborators
    let (locations, products) = match &cfg.seed_file {
        Some(path) => SeedData::from_file(path)?.into_collaborators(),
        None => {
            info!("No seed file configured; starting with empty location and product registries");
            (InMemoryLocationRegistry::new(), InMemoryProductCatalog::new())
        }
    };
    let collaborators = Collaborators {
        locations: Arc::new(locations),
        products: Arc::new(products),
        blind_mode: Arc::new(SystemConfiguration::new(cfg.blind_conference)),
    };

    let service = receiving::build_receiving_service(&cfg, collaborators, event_sender);
    let app = receiving::app_router(receiving::AppState::new(service));

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        environment = %cfg.environment,
        development = cfg.is_development(),
        blind_conference = cfg.blind_conference,
        "stateset-receiving listening on {}",
        addr
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
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
    info!("Shutdown signal received");
}
