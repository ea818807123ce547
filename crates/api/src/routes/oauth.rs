use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header::AUTHORIZATION},
};
use drivegate_services::credential::strip_bearer;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::ApiError, state::AppState};

/// Token pair handed back to API callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsResource {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
}

pub async fn authorize(
    State(state): State<AppState>,
    Query(query): Query<AuthQuery>,
) -> Json<serde_json::Value> {
    let csrf = query
        .state
        .unwrap_or_else(|| format!("{:016x}", rand::random::<u64>()));
    let url = state.credentials.authorize_url(&csrf);
    Json(serde_json::json!({ "url": url }))
}

pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CredentialsResource>, ApiError> {
    if query.code.is_empty() {
        return Err(ApiError::BadRequest("Missing authorization code".to_string()));
    }

    let grant = state.credentials.exchange_code(&query.code).await?;
    info!(has_refresh = grant.refresh_token.is_some(), "Authorization code exchanged");

    Ok(Json(CredentialsResource {
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
    }))
}

/// Exchanges the refresh token carried in the `Authorization` header for a
/// new access token. The supplied refresh token is echoed back unchanged.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CredentialsResource>, ApiError> {
    let refresh_token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(strip_bearer)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("No refresh token provided".to_string()))?;

    let access_token = state.credentials.refresh(refresh_token).await?;

    Ok(Json(CredentialsResource {
        access_token,
        refresh_token: Some(refresh_token.to_string()),
    }))
}
