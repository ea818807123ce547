pub mod jwks;

use std::time::Duration;

use drivegate_config::GoogleSettings;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use jwks::JwksCache;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Refresh failed: {0}")]
    RefreshFailed(String),
    #[error("Authorization code exchange failed: {0}")]
    CodeExchangeFailed(String),
}

/// Trust classification of a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trust {
    Valid,
    Expired,
    Invalid,
}

/// A bearer token together with what the authority said about it.
/// Lives for one request and is never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    trust: Trust,
}

impl Credential {
    pub fn new(token: impl Into<String>, trust: Trust) -> Self {
        Self {
            token: token.into(),
            trust,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.token
    }

    pub fn trust(&self) -> Trust {
        self.trust
    }

    pub fn is_valid(&self) -> bool {
        self.trust == Trust::Valid
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("trust", &self.trust)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Network,
    Malformed,
    UnknownKey,
    BadSignature,
    WrongIssuer,
    WrongAudience,
    Expired,
    Rejected,
}

/// Outcome of validating a token. Validation never fails with an error;
/// every problem is an `Invalid` verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(InvalidReason),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    expires_in: Option<serde_json::Value>,
}

/// Strips an optional `Bearer ` prefix from an `Authorization` header value.
pub fn strip_bearer(header: &str) -> &str {
    let header = header.trim();
    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

/// Validates bearer tokens against the issuing authority and exchanges
/// refresh tokens for new access tokens.
pub struct CredentialManager {
    client: Client,
    settings: GoogleSettings,
    jwks: JwksCache,
}

impl CredentialManager {
    pub fn new(settings: GoogleSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        let jwks = JwksCache::new(
            settings.jwks_url.clone(),
            Duration::from_secs(settings.jwks_cache_ttl_secs),
        );
        Self {
            client,
            settings,
            jwks,
        }
    }

    /// Decides whether `token` is currently accepted by the authority.
    pub async fn validate(&self, token: &str) -> Verdict {
        if token.is_empty() {
            return Verdict::Invalid(InvalidReason::Malformed);
        }

        let verdict = if looks_like_jwt(token) {
            match decode_header(token) {
                Ok(header) => self.validate_signed(token, header.kid).await,
                Err(_) => Verdict::Invalid(InvalidReason::Malformed),
            }
        } else {
            self.validate_opaque(token).await
        };

        debug!(?verdict, "Validated bearer token");
        verdict
    }

    /// Validates `token` and wraps it in a `Credential` with the matching trust class.
    /// Only an `Expired` verdict yields `Trust::Expired`. For opaque tokens that
    /// needs either a non-positive `expires_in` or an introspection error whose
    /// description mentions expiry; any other rejection is `Trust::Invalid`.
    pub async fn credential(&self, token: &str) -> Credential {
        let trust = match self.validate(token).await {
            Verdict::Valid => Trust::Valid,
            Verdict::Invalid(InvalidReason::Expired) => Trust::Expired,
            Verdict::Invalid(_) => Trust::Invalid,
        };
        Credential::new(token, trust)
    }

    async fn validate_signed(&self, token: &str, kid: Option<String>) -> Verdict {
        let Some(kid) = kid else {
            return Verdict::Invalid(InvalidReason::Malformed);
        };

        let jwk = match self.jwks.key(&self.client, &kid).await {
            Ok(Some(jwk)) => jwk,
            Ok(None) => return Verdict::Invalid(InvalidReason::UnknownKey),
            Err(e) => {
                warn!(error = %e, "Failed to fetch signing keys");
                return Verdict::Invalid(InvalidReason::Network);
            }
        };

        let key = match DecodingKey::from_jwk(&jwk) {
            Ok(key) => key,
            Err(_) => return Verdict::Invalid(InvalidReason::UnknownKey),
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.settings.issuer_url]);
        if self.settings.client_id.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&[&self.settings.client_id]);
        }

        match decode::<serde_json::Value>(token, &key, &validation) {
            Ok(_) => Verdict::Valid,
            Err(e) => Verdict::Invalid(match e.kind() {
                ErrorKind::ExpiredSignature => InvalidReason::Expired,
                ErrorKind::InvalidIssuer => InvalidReason::WrongIssuer,
                ErrorKind::InvalidAudience => InvalidReason::WrongAudience,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    InvalidReason::BadSignature
                }
                _ => InvalidReason::Malformed,
            }),
        }
    }

    async fn validate_opaque(&self, token: &str) -> Verdict {
        let resp = match self
            .client
            .get(&self.settings.token_info_url)
            .query(&[("access_token", token)])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "Token introspection request failed");
                return Verdict::Invalid(InvalidReason::Network);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let expired = body["error_description"]
                .as_str()
                .is_some_and(|d| d.to_ascii_lowercase().contains("expired"));
            debug!(%status, expired, "Token introspection rejected token");
            return Verdict::Invalid(if expired {
                InvalidReason::Expired
            } else {
                InvalidReason::Rejected
            });
        }

        let info: TokenInfo = match resp.json().await {
            Ok(info) => info,
            Err(_) => return Verdict::Invalid(InvalidReason::Malformed),
        };

        let expires_in = info.expires_in.and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });
        match expires_in {
            Some(secs) if secs <= 0 => Verdict::Invalid(InvalidReason::Expired),
            _ => Verdict::Valid,
        }
    }

    /// Exchanges a refresh token for a new access token. A rejection is final;
    /// the same refresh token is not retried.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, CredentialError> {
        if refresh_token.is_empty() {
            return Err(CredentialError::RefreshFailed(
                "Empty refresh token".to_string(),
            ));
        }

        let grant = self
            .token_request(&[
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(CredentialError::RefreshFailed)?;

        debug!(expires_in = ?grant.expires_in, "Refreshed access token");
        Ok(grant.access_token)
    }

    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.settings.auth_url,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode(&self.settings.scopes.join(" ")),
            urlencoding::encode(state),
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, CredentialError> {
        self.token_request(&[
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
        .map_err(CredentialError::CodeExchangeFailed)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, String> {
        let resp = self
            .client
            .post(&self.settings.token_exchange_url)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("Token request failed: {}", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let reason = body["error_description"]
                .as_str()
                .or_else(|| body["error"].as_str())
                .unwrap_or("no details");
            return Err(format!("Authority returned {}: {}", status, reason));
        }

        let body: TokenEndpointResponse = resp
            .json()
            .await
            .map_err(|e| format!("Failed to parse token response: {}", e))?;

        match body.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(TokenGrant {
                access_token,
                refresh_token: body.refresh_token,
                expires_in: body.expires_in,
            }),
            _ => Err("Token response has no access_token".to_string()),
        }
    }
}

fn looks_like_jwt(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|s| !s.is_empty())
}
