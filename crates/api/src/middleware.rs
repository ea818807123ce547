use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use drivegate_services::credential::strip_bearer;
use tracing::warn;

use crate::state::AppState;

/// Validates the bearer token and attaches the resulting `Credential` to the
/// request. Requests without a usable token pass through unauthenticated;
/// handlers that need one reject them through `DriveUser`.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(strip_bearer)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    match token {
        Some(token) => {
            let credential = state.credentials.credential(&token).await;
            if credential.is_valid() {
                request.extensions_mut().insert(credential);
            } else {
                warn!(
                    path = %request.uri().path(),
                    trust = ?credential.trust(),
                    "Bearer token rejected, continuing unauthenticated"
                );
            }
        }
        None => {
            warn!(path = %request.uri().path(), "No bearer token, continuing unauthenticated");
        }
    }

    next.run(request).await
}
