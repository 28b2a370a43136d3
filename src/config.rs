// Configuration resolved once at startup and passed explicitly to the
// blob client. Nothing below `main` reads the process environment.

use reqwest::Url;

use crate::error::ConfigError;

/// Environment variable holding the read/write bearer token.
pub const TOKEN_ENV: &str = "BLOB_READ_WRITE_TOKEN";
/// Optional override of the blob API endpoint.
pub const API_URL_ENV: &str = "VERCEL_BLOB_API_URL";
pub const DEFAULT_API_URL: &str = "https://blob.vercel-storage.com";

#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub api_url: Url,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

impl Config {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration through `lookup`, which maps a variable
    /// name to its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = get(TOKEN_ENV).ok_or(ConfigError::MissingToken)?;
        let raw_url = get(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = parse_api_url(&raw_url)?;

        Ok(Config {
            token: token.trim().to_string(),
            api_url,
        })
    }
}

fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidApiUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}
