use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

/// Raw body of a token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// A song as requested by the recommendation source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub artist: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Song {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Desired playlist as produced by the recommendation source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistRequest {
    pub playlist_name: String,
    #[serde(default)]
    pub description: String,
    pub songs: Vec<Song>,
}

/// A catalog track the resolver settled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub id: String,
    pub uri: String,
    pub title: String,
    pub primary_artist: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
}

/// Outcome of resolving one [`Song`].
///
/// `found()` is derived from `track`, so a result can never claim a match
/// without carrying the track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub track: Option<ResolvedTrack>,
    pub reason: Option<String>,
}

impl SearchResult {
    pub fn found(&self) -> bool {
        self.track.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistIdentity {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub track_count: u32,
    pub public: bool,
    pub url: Option<String>,
}

/// Parameters for a playlist the catalog should create.
#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub collaborative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub id: String,
}

/// One page returned by a paginated catalog endpoint.
///
/// `received` counts the entries the remote sent, including any the adapter
/// dropped while converting, so end-of-data detection is not fooled by
/// filtering.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub received: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            received: items.len(),
            items,
        }
    }

    pub fn filtered(items: Vec<T>, received: usize) -> Self {
        Self { items, received }
    }
}

/// Final state of a reconciliation call.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub playlist: PlaylistIdentity,
    pub results: Vec<SearchResult>,
    pub reused: bool,
    pub warnings: Vec<String>,
}

#[derive(Tabled)]
pub struct SearchResultTableRow {
    pub status: String,
    pub requested: String,
    pub matched: String,
}

// Spotify Web API wire types

#[derive(Debug, Clone, Deserialize)]
pub struct PagingObject<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistObject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    pub owner: PlaylistOwner,
    #[serde(default)]
    pub tracks: Option<PlaylistTracksRef>,
    #[serde(default)]
    pub external_urls: Option<ExternalUrls>,
}

impl From<PlaylistObject> for PlaylistIdentity {
    fn from(p: PlaylistObject) -> Self {
        PlaylistIdentity {
            id: p.id,
            name: p.name,
            description: p.description.unwrap_or_default(),
            owner_id: p.owner.id,
            track_count: p.tracks.map(|t| t.total).unwrap_or(0),
            public: p.public.unwrap_or(false),
            url: p.external_urls.and_then(|u| u.spotify),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub is_local: bool,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl TrackObject {
    /// Converts a catalog track, skipping local files, episodes and
    /// tracks without an id.
    pub fn into_resolved(self) -> Option<ResolvedTrack> {
        if self.is_local || self.kind.as_deref().is_some_and(|k| k != "track") {
            return None;
        }
        let id = self.id?;
        let uri = self.uri.unwrap_or_else(|| format!("spotify:track:{}", id));
        let artists: Vec<String> = self.artists.into_iter().map(|a| a.name).collect();
        let year = self
            .album
            .as_ref()
            .and_then(|a| a.release_date.as_deref())
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok());

        Some(ResolvedTrack {
            id,
            uri,
            title: self.name,
            primary_artist: artists.first().cloned().unwrap_or_default(),
            artists,
            album: self.album.map(|a| a.name),
            year,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<PagingObject<TrackObject>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub collaborative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTracksToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveTracksFromPlaylistRequest {
    pub tracks: Vec<TrackUri>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackUri {
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
}
