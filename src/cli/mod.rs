//! # CLI Module
//!
//! Command implementations behind the `setlist` binary. Each command loads
//! what it needs from [`crate::config::Config`], drives the library and
//! reports progress with the crate's output macros.
//!
//! - [`auth`] - browser authorization, caches the token
//! - [`sync`] - create or refresh a playlist from a song list file
//! - [`export`] - write playlists to text files `sync` can read back

mod auth;
mod export;
mod sync;

pub use auth::{access_token, auth};
pub use export::export;
pub use sync::{SyncOptions, load_request, sync};
