use anyhow::Result;
use tracing::info;

use geofence_editor_api::{app, config, middleware, services};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::metrics::init_metrics();

    info!("Starting Geofence Editor v{}", env!("CARGO_PKG_VERSION"));

    let store = app::build_store(&config.backend)?;
    let geocoder = services::geocoding::build_geocoder(&config.geocoding)?;

    let app = app::create_app(config.clone(), store, geocoder);

    let addr = config.socket_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
