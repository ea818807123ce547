use axum::{extract::FromRequestParts, http::request::Parts};
use drivegate_services::Credential;

use crate::error::ApiError;

/// The validated credential of the caller, attached by the authentication
/// middleware. Rejects with 401 when the request carried no usable token.
#[derive(Debug, Clone)]
pub struct DriveUser {
    pub credential: Credential,
}

impl<S> FromRequestParts<S> for DriveUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credential = parts
            .extensions
            .get::<Credential>()
            .filter(|c| c.is_valid())
            .cloned()
            .ok_or_else(|| {
                ApiError::Unauthorized("Missing or invalid bearer token".to_string())
            })?;

        Ok(DriveUser { credential })
    }
}
