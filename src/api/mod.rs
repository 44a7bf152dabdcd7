//! # API Module
//!
//! HTTP surface of the ephemeral OAuth callback listener. The router holds a
//! single route, the path of the configured redirect URL, which completes one
//! authorization attempt and then answers every further request with an
//! "already handled" page.

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

mod callback;

pub use callback::{CallbackParams, CallbackState, Completion, callback};

/// Router serving [`callback`] at `path`.
pub fn router(path: &str, state: CallbackState) -> Router {
    let path = if path.is_empty() { "/" } else { path };
    Router::new().route(path, get(callback).layer(Extension(Arc::new(state))))
}
