use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace};

use super::run_migrations;
use crate::config::{build_app_state, connect_database, Settings};
use crate::router::create_router;

pub async fn serve(migrate: bool) -> Result<()> {
    trace!("Entering serve function");
    info!("Restorust application starting up");

    let settings = match Settings::load() {
        Ok(settings) => {
            debug!("Settings loaded, public URL {}", settings.public_url(""));
            settings
        }
        Err(e) => {
            error!("Failed to load settings: {}", e);
            return Err(e.into());
        }
    };
    let bind_address = settings.bind_address();

    let db = match connect_database(&settings).await {
        Ok(db) => {
            debug!("Database connection established");
            db
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", settings.database_url, e);
            return Err(e);
        }
    };

    if migrate {
        run_migrations(&db).await?;
    }

    let state = build_app_state(db, settings);

    // Create router
    trace!("Creating application router");
    let app = create_router(state);
    debug!("Router created successfully");

    // Start server
    info!("Starting server on {}", bind_address);
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("Restorust API server running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    trace!("Starting axum server");
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}
