use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub google: GoogleSettings,
    pub drive: DriveSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Everything the credential manager needs to talk to the issuing authority.
#[derive(Debug, Deserialize, Clone)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Expected `iss` claim of signed tokens.
    pub issuer_url: String,
    pub token_exchange_url: String,
    pub token_info_url: String,
    pub jwks_url: String,
    pub auth_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub jwks_cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveSettings {
    pub api_url: String,
    pub upload_url: String,
    pub page_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportSettings {
    pub max_depth: usize,
    pub sort_by_name: bool,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("DRIVEGATE")
                    .list_separator(",")
                    .with_list_parse_key("app.cors_origins")
                    .with_list_parse_key("google.scopes")
                    .try_parsing(true),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8081)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("google.client_id", "")?
            .set_default("google.client_secret", "")?
            .set_default("google.issuer_url", "https://accounts.google.com")?
            .set_default("google.token_exchange_url", "https://oauth2.googleapis.com/token")?
            .set_default("google.token_info_url", "https://oauth2.googleapis.com/tokeninfo")?
            .set_default("google.jwks_url", "https://www.googleapis.com/oauth2/v3/certs")?
            .set_default("google.auth_url", "https://accounts.google.com/o/oauth2/v2/auth")?
            .set_default("google.redirect_uri", "http://localhost:8081/oauth2/callback")?
            .set_default(
                "google.scopes",
                vec!["https://www.googleapis.com/auth/drive.file".to_string()],
            )?
            .set_default("google.jwks_cache_ttl_secs", 3600)?
            .set_default("google.http_timeout_secs", 30)?
            .set_default("drive.api_url", "https://www.googleapis.com/drive/v3")?
            .set_default("drive.upload_url", "https://www.googleapis.com/upload/drive/v3")?
            .set_default("drive.page_size", 100)?
            .set_default("export.max_depth", 64)?
            .set_default("export.sort_by_name", false)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
