use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::{
    config,
    error::{AuthError, TokenCacheError},
    spotify::auth::SpotifyAccounts,
    types::Token,
    warning,
};

/// Seconds before expiry at which a cached token is already treated as
/// expired.
const EXPIRY_MARGIN_SECS: u64 = 240;

/// On-disk cache of the last token obtained by `setlist auth`.
pub struct TokenManager {
    token: Token,
    path: PathBuf,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        Self::with_path(token, Self::token_path())
    }

    pub fn with_path(token: Token, path: PathBuf) -> Self {
        TokenManager { token, path }
    }

    pub async fn load() -> Result<Self, TokenCacheError> {
        Self::load_from(&Self::token_path()).await
    }

    pub async fn load_from(path: &Path) -> Result<Self, TokenCacheError> {
        let content = async_fs::read_to_string(path).await?;
        let token: Token = serde_json::from_str(&content)?;
        Ok(Self {
            token,
            path: path.to_path_buf(),
        })
    }

    pub async fn persist(&self) -> Result<(), TokenCacheError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.token)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Access token that is valid for at least a few more minutes,
    /// refreshing and re-persisting it first when needed.
    pub async fn get_valid_token(
        &mut self,
        accounts: &SpotifyAccounts,
    ) -> Result<String, TokenCacheError> {
        if self.is_expired() {
            if self.token.refresh_token.is_empty() {
                return Err(TokenCacheError::Refresh(AuthError::Exchange(
                    "no refresh token cached, run `setlist auth`".to_string(),
                )));
            }

            let refreshed = accounts
                .refresh(&self.token.refresh_token)
                .await
                .map_err(TokenCacheError::Refresh)?;
            self.token = refreshed;
            if let Err(e) = self.persist().await {
                warning!("Failed to persist refreshed token: {}", e);
            }
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp() as u64)
    }

    fn is_expired_at(&self, now: u64) -> bool {
        let expires_at = self.token.obtained_at + self.token.expires_in;
        now >= expires_at.saturating_sub(EXPIRY_MARGIN_SECS)
    }

    fn token_path() -> PathBuf {
        config::data_dir().join("cache").join("token.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }
}
