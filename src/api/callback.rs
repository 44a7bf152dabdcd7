use std::sync::Arc;

use axum::{Extension, extract::Query, http::StatusCode, response::Html};
use serde::Deserialize;
use tokio::sync::{Mutex, oneshot};

use crate::{error::AuthError, spotify::auth::TokenExchange, types::Token, warning};

type Outcome = Result<Token, AuthError>;

/// Single-use slot delivering the outcome of an authorization attempt.
///
/// Whoever takes the sender first (the callback handler or a failing
/// listener) decides the outcome; later takers get `None`.
#[derive(Clone)]
pub struct Completion(Arc<Mutex<Option<oneshot::Sender<Outcome>>>>);

impl Completion {
    pub fn new() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (Self(Arc::new(Mutex::new(Some(tx)))), rx)
    }

    pub async fn take(&self) -> Option<oneshot::Sender<Outcome>> {
        self.0.lock().await.take()
    }

    /// Completes with `err` unless already completed.
    pub async fn fail(&self, err: AuthError) -> bool {
        match self.take().await {
            Some(tx) => tx.send(Err(err)).is_ok(),
            None => false,
        }
    }
}

/// What the callback route needs to finish one attempt.
#[derive(Clone)]
pub struct CallbackState {
    pub expected_state: String,
    pub code_verifier: String,
    pub exchange: Arc<dyn TokenExchange>,
    pub completion: Completion,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(state): Extension<Arc<CallbackState>>,
) -> (StatusCode, Html<String>) {
    let Some(tx) = state.completion.take().await else {
        return page(
            StatusCode::GONE,
            "Already handled",
            "This authorization attempt is already finished. You can close this window.",
        );
    };

    let outcome = handle(&params, &state).await;
    let response = match &outcome {
        Ok(_) => page(
            StatusCode::OK,
            "Authentication successful",
            "You can close this window and return to the terminal.",
        ),
        Err(e @ (AuthError::StateMismatch | AuthError::MissingCode)) => {
            page(StatusCode::BAD_REQUEST, "Login failed", &e.to_string())
        }
        Err(e @ AuthError::Denied(_)) => page(StatusCode::FORBIDDEN, "Login failed", &e.to_string()),
        Err(e) => page(StatusCode::BAD_GATEWAY, "Login failed", &e.to_string()),
    };

    if let Err(e) = &outcome {
        warning!("Authorization callback failed: {}", e);
    }
    // the waiting flow may already be gone after a cancellation
    let _ = tx.send(outcome);
    response
}

async fn handle(params: &CallbackParams, state: &CallbackState) -> Result<Token, AuthError> {
    if params.state.as_deref() != Some(state.expected_state.as_str()) {
        return Err(AuthError::StateMismatch);
    }

    if let Some(error) = &params.error {
        let reason = match &params.error_description {
            Some(description) => format!("{} ({})", error, description),
            None => error.clone(),
        };
        return Err(AuthError::Denied(reason));
    }

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::MissingCode)?;

    state
        .exchange
        .exchange_code(code, &state.code_verifier)
        .await
}

fn page(status: StatusCode, title: &str, message: &str) -> (StatusCode, Html<String>) {
    (
        status,
        Html(format!(
            "<!doctype html><html><head><title>setlist</title></head>\
             <body><h2>{}</h2><p>{}</p></body></html>",
            escape(title),
            escape(message)
        )),
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
