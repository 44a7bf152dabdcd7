use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use url::Url;

use crate::{
    api::{self, CallbackState, Completion},
    config::Config,
    error::{AuthError, CancelReason},
    server::{CallbackServer, RedirectTarget, TlsMaterial},
    types::{Token, TokenResponse},
    utils,
};

pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Exchanges an authorization code for a token.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Token, AuthError>;
}

/// Spotify accounts service: authorization-code exchange and refresh.
#[derive(Debug, Clone)]
pub struct SpotifyAccounts {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl SpotifyAccounts {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
        }
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
        previous_refresh_token: Option<&str>,
    ) -> Result<Token, AuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error text".to_string());
            return Err(AuthError::Exchange(format!("{}: {}", status, body)));
        }

        let json = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        Ok(Token {
            access_token: json.access_token,
            // Spotify may omit the refresh token when refreshing
            refresh_token: json
                .refresh_token
                .or_else(|| previous_refresh_token.map(str::to_string))
                .unwrap_or_default(),
            scope: json.scope.unwrap_or_default(),
            expires_in: json.expires_in,
            obtained_at: Utc::now().timestamp() as u64,
        })
    }

    /// Refreshes an expired access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        self.request_token(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
            ],
            Some(refresh_token),
        )
        .await
    }
}

#[async_trait]
impl TokenExchange for SpotifyAccounts {
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Token, AuthError> {
        self.request_token(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
                ("code_verifier", code_verifier),
            ],
            None,
        )
        .await
    }
}

/// Phases of one authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Idle,
    ListenerStarted,
    AwaitingCallback,
    TokenObtained,
    Failed,
    Cancelled,
}

impl AuthPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AuthPhase::TokenObtained | AuthPhase::Failed | AuthPhase::Cancelled
        )
    }
}

/// Per-attempt secrets plus the current phase. Never reused across
/// attempts.
#[derive(Debug)]
pub struct AuthSession {
    state: String,
    code_verifier: String,
    phase: AuthPhase,
}

impl AuthSession {
    pub fn new() -> Self {
        Self {
            state: utils::generate_state(),
            code_verifier: utils::generate_code_verifier(),
            phase: AuthPhase::Idle,
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn code_verifier(&self) -> &str {
        &self.code_verifier
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    fn advance(&mut self, next: AuthPhase) {
        debug_assert!(
            !self.phase.is_terminal(),
            "authorization already finished as {:?}",
            self.phase
        );
        self.phase = next;
    }

    fn finish(&mut self, result: &Result<Token, AuthError>) {
        self.advance(match result {
            Ok(_) => AuthPhase::TokenObtained,
            Err(AuthError::Cancelled(_)) => AuthPhase::Cancelled,
            Err(_) => AuthPhase::Failed,
        });
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the callback server gets its certificate when the redirect URL
/// is `https`.
#[derive(Debug, Clone, Default)]
pub enum TlsSource {
    /// Throwaway self-signed certificate for this attempt only.
    #[default]
    SelfSigned,
    Files { cert: PathBuf, key: PathBuf },
}

impl TlsSource {
    async fn load(&self) -> Result<TlsMaterial, AuthError> {
        match self {
            TlsSource::SelfSigned => TlsMaterial::self_signed(),
            TlsSource::Files { cert, key } => TlsMaterial::from_files(cert, key).await,
        }
    }
}

/// Settings for [`AuthorizationFlow`].
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub client_id: String,
    pub authorize_url: String,
    pub redirect_url: String,
    pub scope: String,
    pub tls: TlsSource,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        let tls = match (&config.tls_cert, &config.tls_key) {
            (Some(cert), Some(key)) => TlsSource::Files {
                cert: cert.clone(),
                key: key.clone(),
            },
            _ => TlsSource::SelfSigned,
        };

        Self {
            client_id: config.client_id.clone(),
            authorize_url: config.auth_url.clone(),
            redirect_url: config.redirect_url.clone(),
            scope: config.scope.clone(),
            tls,
        }
    }
}

/// Loopback OAuth authorization-code flow.
///
/// Each call to [`AuthorizationFlow::authorize`] starts a single-use
/// callback server on the exact host and port of the redirect URL, hands
/// the authorization URL to the caller once the server is listening, and
/// waits for the first of: a callback (token or failure), a listener error,
/// or the caller's cancellation. The server is shut down with a bounded
/// grace period on every outcome.
pub struct AuthorizationFlow {
    settings: AuthSettings,
    exchange: Arc<dyn TokenExchange>,
    grace: Duration,
}

impl AuthorizationFlow {
    pub fn new(settings: AuthSettings, exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            settings,
            exchange,
            grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Authorization URL for `session`, embedding its state and PKCE
    /// challenge.
    pub fn authorization_url(&self, session: &AuthSession) -> Result<Url, AuthError> {
        let challenge = utils::generate_code_challenge(session.code_verifier());
        Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.settings.redirect_url.as_str()),
                ("state", session.state()),
                ("scope", self.settings.scope.as_str()),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| AuthError::InvalidRedirect {
            url: self.settings.authorize_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Runs one authorization attempt on a fresh [`AuthSession`].
    ///
    /// `prompt` receives the authorization URL after the callback server is
    /// accepting connections. `cancel` resolves when the caller gives up
    /// (timeout, Ctrl-C); if it fires before a callback arrives the attempt
    /// ends with [`AuthError::Cancelled`].
    ///
    /// # Errors
    ///
    /// Invalid or non-loopback redirect URL, bind or TLS failure, listener
    /// error, denied authorization, state mismatch, missing code, failed
    /// code exchange, or cancellation. No token is returned in any of these
    /// cases.
    pub async fn authorize<P, C>(&self, prompt: P, cancel: C) -> Result<Token, AuthError>
    where
        P: FnOnce(&str),
        C: Future<Output = CancelReason>,
    {
        let mut session = AuthSession::new();
        self.authorize_session(&mut session, prompt, cancel).await
    }

    /// Like [`AuthorizationFlow::authorize`], on a caller-owned session.
    /// The session ends in a terminal [`AuthPhase`] whatever the outcome.
    ///
    /// # Errors
    ///
    /// [`AuthError::SessionReused`] when `session` has left
    /// [`AuthPhase::Idle`], otherwise as for `authorize`.
    pub async fn authorize_session<P, C>(
        &self,
        session: &mut AuthSession,
        prompt: P,
        cancel: C,
    ) -> Result<Token, AuthError>
    where
        P: FnOnce(&str),
        C: Future<Output = CancelReason>,
    {
        if session.phase() != AuthPhase::Idle {
            return Err(AuthError::SessionReused);
        }

        let result = self.run(session, prompt, cancel).await;
        session.finish(&result);
        result
    }

    async fn run<P, C>(
        &self,
        session: &mut AuthSession,
        prompt: P,
        cancel: C,
    ) -> Result<Token, AuthError>
    where
        P: FnOnce(&str),
        C: Future<Output = CancelReason>,
    {
        let target = RedirectTarget::parse(&self.settings.redirect_url)?;
        let auth_url = self.authorization_url(session)?;

        let tls = if target.is_secure() {
            Some(self.settings.tls.load().await?)
        } else {
            None
        };

        let (completion, outcome) = Completion::new();
        let app = api::router(
            target.path(),
            CallbackState {
                expected_state: session.state().to_string(),
                code_verifier: session.code_verifier().to_string(),
                exchange: Arc::clone(&self.exchange),
                completion: completion.clone(),
            },
        );

        let server = CallbackServer::start(&target, app, tls, completion).await?;
        session.advance(AuthPhase::ListenerStarted);

        prompt(auth_url.as_str());
        session.advance(AuthPhase::AwaitingCallback);

        let result = tokio::select! {
            outcome = outcome => outcome.unwrap_or_else(|_| {
                Err(AuthError::Listener("callback channel closed".to_string()))
            }),
            reason = cancel => Err(AuthError::Cancelled(reason)),
        };

        server.shutdown(self.grace).await;
        result
    }
}
