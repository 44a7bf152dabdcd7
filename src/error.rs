//! Error types shared across the library.
//!
//! The CLI layer flattens everything into [`crate::Res`]; the library keeps
//! the failure classes apart so callers can tell a fatal reconciliation
//! error from a per-query hiccup.

use std::{fmt, io, net::SocketAddr};

use crate::types::SearchResult;

/// Failure talking to the remote catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to send http request: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Spotify API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Rate limited by Spotify, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },
    #[error("Spotify API still unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },
    #[error("Batch of {size} items exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Why an authorization wait was abandoned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    TimedOut,
    Aborted,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::TimedOut => write!(f, "timed out"),
            CancelReason::Aborted => write!(f, "aborted"),
        }
    }
}

/// Authorization attempt failures. None of these carry a usable token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid redirect URL {url}: {reason}")]
    InvalidRedirect { url: String, reason: String },
    #[error("Redirect host {0} is not a loopback address")]
    NonLoopbackRedirect(String),
    #[error("Failed to bind callback listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Failed to prepare TLS material: {0}")]
    Tls(String),
    #[error("Callback listener error: {0}")]
    Listener(String),
    #[error("Authorization was denied: {0}")]
    Denied(String),
    #[error("Callback state does not match this authorization attempt")]
    StateMismatch,
    #[error("Callback did not carry an authorization code")]
    MissingCode,
    #[error("Failed to exchange authorization code: {0}")]
    Exchange(String),
    #[error("Authorization {0}")]
    Cancelled(CancelReason),
    #[error("Authorization session was already used")]
    SessionReused,
}

/// The step of a reconciliation that failed fatally.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileFailure {
    #[error("Failed to get current user: {0}")]
    CurrentUser(#[source] CatalogError),
    #[error("Failed to create playlist: {0}")]
    CreatePlaylist(#[source] CatalogError),
    #[error("Failed to add tracks to playlist {playlist_id} after {added} tracks: {source}")]
    AddTracks {
        playlist_id: String,
        added: usize,
        #[source]
        source: CatalogError,
    },
}

/// Fatal reconciliation error, carrying the per-song results gathered
/// before the abort.
#[derive(Debug, thiserror::Error)]
#[error("{failure}")]
pub struct ReconcileError {
    #[source]
    pub failure: ReconcileFailure,
    pub partial: Vec<SearchResult>,
}

impl ReconcileError {
    pub fn new(failure: ReconcileFailure, partial: Vec<SearchResult>) -> Self {
        Self { failure, partial }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Playlist '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Failed to write export file: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("Failed to load environment file: {0}")]
    Env(String),
}

/// Failure reading, writing or refreshing the cached token.
#[derive(Debug, thiserror::Error)]
pub enum TokenCacheError {
    #[error("Failed to access token cache: {0}")]
    Io(#[from] io::Error),
    #[error("Token cache is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Failed to refresh token: {0}")]
    Refresh(#[source] AuthError),
}
