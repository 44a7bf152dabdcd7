use async_trait::async_trait;

use crate::{
    error::CatalogError,
    types::{NewPlaylist, Page, PlaylistIdentity, ResolvedTrack, UserProfile},
};

/// Remote catalog and playlist store operations used by the resolver,
/// the reconciler and the exporter.
///
/// [`super::client::SpotifyClient`] is the production implementation.
/// Batch operations take at most [`crate::config::MAX_BATCH_SIZE`] items.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn current_user(&self) -> Result<UserProfile, CatalogError>;

    /// One page of the current user's playlists.
    async fn user_playlists(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistIdentity>, CatalogError>;

    async fn create_playlist(
        &self,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<PlaylistIdentity, CatalogError>;

    /// One page of a playlist's tracks. Entries that are not catalog tracks
    /// (local files, episodes) are left out.
    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ResolvedTrack>, CatalogError>;

    /// One page of a playlist's entries as URIs, local files and episodes
    /// included. `None` marks an entry without a URI.
    async fn playlist_item_uris(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Option<String>>, CatalogError>;

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError>;

    async fn remove_tracks(&self, playlist_id: &str, uris: &[String])
    -> Result<(), CatalogError>;

    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<ResolvedTrack>, CatalogError>;
}
