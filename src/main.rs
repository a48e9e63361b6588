use givplus::{
    AppState,
    config::{self, database},
    core::payment,
    errors::Result,
    router,
};
use dotenvy::dotenv;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("givplus=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load .env file, non-fatal since variables can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load configuration (config.toml, then environment overrides)
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Fail donations whose payment never got confirmed
    let payments = &app_config.payments;
    tokio::spawn(payment::run_timeout_sweeper(
        db.clone(),
        Duration::from_secs(payments.timeout_secs),
        Duration::from_secs(payments.sweep_interval_secs),
    ));
    if payments.simulate_confirmation_after_ms.is_some() {
        warn!("Payment simulator enabled: every donation will be confirmed automatically");
    }

    // 6. Serve
    let bind_addr = app_config.server.bind_addr.clone();
    let app = router(AppState::new(db, app_config));
    let listener = TcpListener::bind(&bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_addr, e))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, stopping server.");
}
