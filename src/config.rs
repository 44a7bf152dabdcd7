//! Configuration management for setlist.
//!
//! Values come from environment variables, optionally seeded from `.env`
//! files. Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `.env` in the current working directory
//! 3. `.env` in the local data directory (`setlist/.env`)
//! 4. Defaults for everything except the client credentials

use std::{env, path::PathBuf, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_REDIRECT_URL: &str = "http://127.0.0.1:8080/callback";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SCOPE: &str =
    "user-read-private playlist-read-private playlist-modify-public playlist-modify-private";

/// Spotify rejects add/remove requests carrying more than this many items.
pub const MAX_BATCH_SIZE: usize = 100;
/// Largest `limit` accepted by `/me/playlists`.
pub const MAX_PLAYLIST_PAGE_SIZE: u32 = 50;
/// Largest `limit` accepted by `/playlists/{id}/tracks`.
pub const MAX_TRACK_PAGE_SIZE: u32 = 100;
/// Largest `limit` accepted by `/search`.
pub const MAX_SEARCH_LIMIT: u32 = 50;

/// Loads `.env` files from the working directory and the local data
/// directory. Missing files are not an error; malformed ones are.
///
/// The data directory is resolved per platform:
/// - Linux: `~/.local/share/setlist/.env`
/// - macOS: `~/Library/Application Support/setlist/.env`
/// - Windows: `%LOCALAPPDATA%/setlist/.env`
pub async fn load_env() -> Result<(), ConfigError> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::Env(e.to_string()))?;
    }

    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            return Err(ConfigError::Env(e.to_string()));
        }
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| ConfigError::Env(e.to_string()))?;
    }
    Ok(())
}

/// Root of everything setlist keeps on disk.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("setlist");
    path
}

/// Page sizes, safety caps and batch size for remote traversals.
///
/// The remote collections are user controlled and unbounded, so every
/// traversal is capped; hitting a cap truncates silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub playlist_page_size: u32,
    pub playlist_scan_cap: usize,
    pub track_page_size: u32,
    pub track_scan_cap: usize,
    pub batch_size: usize,
    pub search_limit: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            playlist_page_size: 50,
            playlist_scan_cap: 1000,
            track_page_size: 100,
            track_scan_cap: 10_000,
            batch_size: MAX_BATCH_SIZE,
            search_limit: 20,
        }
    }
}

impl Limits {
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();

        Ok(Self {
            playlist_page_size: parse_or("SETLIST_PLAYLIST_PAGE_SIZE", d.playlist_page_size)?,
            playlist_scan_cap: parse_or("SETLIST_PLAYLIST_SCAN_CAP", d.playlist_scan_cap)?,
            track_page_size: parse_or("SETLIST_TRACK_PAGE_SIZE", d.track_page_size)?,
            track_scan_cap: parse_or("SETLIST_TRACK_SCAN_CAP", d.track_scan_cap)?,
            batch_size: parse_or("SETLIST_BATCH_SIZE", d.batch_size)?,
            search_limit: parse_or("SETLIST_SEARCH_LIMIT", d.search_limit)?,
        }
        .clamped())
    }

    /// Brings page sizes, batch size and search limit into the ranges the
    /// Web API accepts. Scan caps are left alone.
    pub fn clamped(self) -> Self {
        Self {
            playlist_page_size: self.playlist_page_size.clamp(1, MAX_PLAYLIST_PAGE_SIZE),
            track_page_size: self.track_page_size.clamp(1, MAX_TRACK_PAGE_SIZE),
            batch_size: self.batch_size.clamp(1, MAX_BATCH_SIZE),
            search_limit: self.search_limit.clamp(1, MAX_SEARCH_LIMIT),
            ..self
        }
    }
}

/// Settings needed to run the authorization flow and talk to the API.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scope: String,
    pub api_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub auth_timeout: Duration,
    pub limits: Limits,
}

impl Config {
    /// Reads and validates the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Fails when `SPOTIFY_CLIENT_ID` or `SPOTIFY_CLIENT_SECRET` is missing,
    /// when only one of the TLS paths is set, or when a numeric setting
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = required("SPOTIFY_CLIENT_ID")?;
        let client_secret = required("SPOTIFY_CLIENT_SECRET")?;

        let tls_cert = optional("SETLIST_TLS_CERT").map(PathBuf::from);
        let tls_key = optional("SETLIST_TLS_KEY").map(PathBuf::from);
        if tls_cert.is_some() != tls_key.is_some() {
            return Err(ConfigError::Invalid {
                key: "SETLIST_TLS_CERT",
                reason: "SETLIST_TLS_CERT and SETLIST_TLS_KEY must be set together".to_string(),
            });
        }

        let timeout_secs: u64 = parse_or("SETLIST_AUTH_TIMEOUT_SECS", 300)?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_url: optional("SPOTIFY_REDIRECT_URL")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
            scope: optional("SPOTIFY_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            api_url: optional("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            auth_url: optional("SPOTIFY_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_url: optional("SPOTIFY_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            tls_cert,
            tls_key,
            auth_timeout: Duration::from_secs(timeout_secs),
            limits: Limits::from_env()?,
        })
    }

    /// Whether the redirect URL requires the callback server to speak TLS.
    pub fn redirect_is_secure(&self) -> bool {
        self.redirect_url
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("https://")
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
