use dotenvy::dotenv;
use fruit_pos::{
    api::{self, AppState},
    config::{self, database, secrets},
    core::{auth, category},
    errors::Result,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars may also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the admin account and configured categories
    auth::ensure_admin(&db, secrets::initial_admin_pin().as_deref()).await?;
    let seeded = category::seed_categories(&db, &app_config.seed.categories).await?;
    if seeded > 0 {
        info!(seeded, "Seeded categories");
    }

    // 6. Serve the API
    let sessions = auth::SessionKeys::new(
        &secrets::session_secret()?,
        app_config.auth.session_hours,
    );
    let bind = app_config.server.bind.clone();
    let app = api::router(AppState {
        db,
        config: Arc::new(app_config),
        sessions: Arc::new(sessions),
    });

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind, e))?;
    info!("Fruit POS listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
