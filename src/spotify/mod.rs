//! # Spotify Integration Module
//!
//! Everything that talks to Spotify, or reasons about what Spotify returns.
//!
//! ```text
//! CLI (auth, sync, export)
//!          ↓
//!     ├── auth        loopback OAuth authorization-code flow
//!     ├── playlist    PlaylistReconciler: create or refresh a playlist
//!     ├── search      TrackResolver + match policies
//!     └── pagination  PaginatedCollector for offset/limit endpoints
//!          ↓
//!     catalog (trait) ← client (SpotifyClient, reqwest)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Authentication
//!
//! [`auth`] runs one authorization attempt per call: a fresh anti-forgery
//! `state` and PKCE verifier, an ephemeral callback listener on the exact
//! loopback address of the redirect URL, and a race between the callback
//! and the caller's cancellation. The listener is always shut down before
//! `authorize` returns.
//!
//! ## Catalog
//!
//! [`catalog::Catalog`] is the seam between the engine and the network.
//! [`client::SpotifyClient`] implements it against the Web API and deals
//! with rate limiting (`429` with `Retry-After`) and transient `502`/`503`
//! responses. Tests substitute an in-memory catalog.
//!
//! ## Reconciliation
//!
//! [`playlist::PlaylistReconciler`] is idempotent per playlist name: an
//! existing playlist owned by the user is reused and cleared, otherwise a
//! new private playlist is created. Songs are resolved strictly in order by
//! [`search::TrackResolver`] and added in batches of at most 100.

pub mod auth;
pub mod catalog;
pub mod client;
pub mod pagination;
pub mod playlist;
pub mod search;
