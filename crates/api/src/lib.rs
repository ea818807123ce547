pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    // OAuth routes (no auth required)
    let oauth_routes = Router::new()
        .route("/auth", get(routes::oauth::authorize))
        .route("/callback", get(routes::oauth::callback))
        .route("/refresh", post(routes::oauth::refresh));

    // Drive routes (bearer token required)
    let drive_routes = Router::new()
        .route("/files", get(routes::drive::list))
        .route("/files/{file_id}", get(routes::drive::get))
        .route("/upload", post(routes::drive::upload))
        .route("/download/file", get(routes::drive::download_file))
        .route("/download/folder", get(routes::drive::download_folder))
        .route("/delete", delete(routes::drive::delete));

    let api = Router::new()
        .nest("/drive", drive_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ));

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .nest("/oauth2", oauth_routes)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if parsed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(parsed)
    }
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
