mod api;
mod config;
mod range;
mod state;
mod utils;

use std::sync::Arc;

use api::api_router;
use common::{COVERS_DIR, THUMBNAILS_DIR, UPLOADS_DIR};
use config::{config_path_from_env, load_or_create_config, public_base_url, resolve_path};
use library::{DiskStorage, MediaStorage, PathResolver, RedbCatalog};
use state::AppState;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let data_root = resolve_path(&config_path, config.data_root.trim());
    let storage = DiskStorage::new(data_root);
    for dir in [UPLOADS_DIR, COVERS_DIR, THUMBNAILS_DIR] {
        storage.ensure_dir(dir)?;
    }
    info!("Serving media from {:?}", storage.root());

    let catalog_path = resolve_path(&config_path, config.catalog_path.trim());
    if let Some(parent) = catalog_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let catalog = RedbCatalog::open(&catalog_path)?;

    let base_url = public_base_url(&config);
    if base_url.is_empty() {
        warn!("Public base URL is empty; clients will receive relative URLs.");
    }
    info!("Public base URL: {}", base_url);
    let resolver = PathResolver::new(&base_url);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let state = AppState {
        config: Arc::new(config),
        storage: Arc::new(storage),
        catalog,
        resolver: Arc::new(resolver),
    };

    let app = api_router(state)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}
