use drivegate_api::{build_router, state::AppState};
use drivegate_config::Settings;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "drivegate_api=debug,drivegate_services=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let settings = Settings::load()?;
    info!("Starting drivegate API on {}:{}", settings.app.host, settings.app.port);
    info!(
        issuer = %settings.google.issuer_url,
        drive_api = %settings.drive.api_url,
        max_depth = settings.export.max_depth,
        sort_by_name = settings.export.sort_by_name,
        "Google Drive config"
    );
    if settings.google.client_id.is_empty() {
        tracing::warn!("google.client_id is empty, audience checks on signed tokens are disabled");
    }

    let app = build_router(AppState::new(settings.clone()));

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
