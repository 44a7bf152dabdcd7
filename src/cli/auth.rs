use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Res,
    config::Config,
    error::CancelReason,
    info,
    management::TokenManager,
    spotify::auth::{AuthSettings, AuthorizationFlow, SpotifyAccounts},
    success,
    types::Token,
    warning,
};

/// Runs the browser authorization and caches the resulting token.
pub async fn auth(config: &Config) -> Res<()> {
    let token = authorize(config).await?;
    let manager = TokenManager::new(token);
    manager.persist().await?;
    success!("Authentication successful!");
    Ok(())
}

/// Access token from the cache, refreshed if needed. Falls back to the
/// browser authorization when nothing usable is cached.
pub async fn access_token(config: &Config) -> Res<String> {
    let accounts = SpotifyAccounts::new(config);

    match TokenManager::load().await {
        Ok(mut manager) => match manager.get_valid_token(&accounts).await {
            Ok(token) => return Ok(token),
            Err(e) => warning!("{}", e),
        },
        Err(_) => info!("No cached token found, starting authorization"),
    }

    let token = authorize(config).await?;
    let manager = TokenManager::new(token.clone());
    if let Err(e) = manager.persist().await {
        warning!("Failed to save token to cache: {}", e);
    }
    Ok(token.access_token)
}

async fn authorize(config: &Config) -> Res<Token> {
    let flow = AuthorizationFlow::new(
        AuthSettings::from_config(config),
        Arc::new(SpotifyAccounts::new(config)),
    );

    if config.redirect_is_secure() && config.tls_cert.is_none() {
        info!("Using a throwaway self-signed certificate, expect a browser warning");
    }

    let pb = ProgressBar::new_spinner();
    let spinner = pb.clone();
    let prompt = move |url: &str| {
        info!("Open the following URL to authorize setlist:\n{}", url);
        if webbrowser::open(url).is_err() {
            warning!("Failed to open browser. Please navigate to the URL above manually.");
        }

        spinner.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.set_message("Waiting for authorization callback...");
        spinner.enable_steady_tick(Duration::from_millis(100));
    };

    let timeout = config.auth_timeout;
    let cancel = async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => CancelReason::TimedOut,
            Ok(()) = tokio::signal::ctrl_c() => CancelReason::Aborted,
        }
    };

    let result = flow.authorize(prompt, cancel).await;
    pb.finish_and_clear();
    Ok(result?)
}
