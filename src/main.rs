use std::sync::Arc;

use campaign_dispatch::campaigns::Dispatcher;
use campaign_dispatch::config::{DispatchConfig, ServerConfig, SheetsConfig, SmtpConfig};
use campaign_dispatch::server::{AppState, app_router};
use campaign_dispatch::sheets::{GoogleSheetsClient, SpreadsheetSource};
use campaign_dispatch::store::{Database, LibSqlBackend};
use campaign_dispatch::transport::create_transport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server_config = ServerConfig::from_env()?;
    let dispatch_config = DispatchConfig::from_env()?;

    eprintln!("📬 Campaign Dispatch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api", server_config.http_port);
    eprintln!("   Database: {}", server_config.db_path);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(std::path::Path::new(&server_config.db_path))
            .await
            .map_err(|e| format!("Failed to open database at {}: {e}", server_config.db_path))?,
    );

    // ── Mail transport & spreadsheet source ─────────────────────────────
    let transport = create_transport(SmtpConfig::from_env()?)?;
    eprintln!("   Mail transport: {}", transport.name());
    let sheets: Arc<dyn SpreadsheetSource> =
        Arc::new(GoogleSheetsClient::new(SheetsConfig::from_env()));

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&db), transport, dispatch_config));

    let app = app_router(AppState {
        db,
        dispatcher,
        sheets,
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", server_config.http_port)).await?;
    tracing::info!(port = server_config.http_port, "HTTP API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
