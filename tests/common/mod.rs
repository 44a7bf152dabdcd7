#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use setlist::{
    error::{AuthError, CatalogError},
    spotify::{auth::TokenExchange, catalog::Catalog},
    types::{NewPlaylist, Page, PlaylistIdentity, ResolvedTrack, Token, UserProfile},
};

pub fn track(id: &str, title: &str, artist: &str) -> ResolvedTrack {
    ResolvedTrack {
        id: id.to_string(),
        uri: format!("spotify:track:{}", id),
        title: title.to_string(),
        primary_artist: artist.to_string(),
        artists: vec![artist.to_string()],
        album: None,
        year: None,
    }
}

pub fn failure(message: &str) -> CatalogError {
    CatalogError::Status {
        status: 500,
        message: message.to_string(),
    }
}

pub struct StoredPlaylist {
    pub identity: PlaylistIdentity,
    pub tracks: Vec<ResolvedTrack>,
    /// Entries that are not catalog tracks: local files, episodes, or
    /// `None` for an entry without a URI.
    pub others: Vec<Option<String>>,
}

impl StoredPlaylist {
    fn entry_count(&self) -> u32 {
        (self.tracks.len() + self.others.len()) as u32
    }
}

#[derive(Default)]
struct State {
    playlists: Vec<StoredPlaylist>,
    searches: Vec<String>,
    add_batches: Vec<(String, Vec<String>)>,
    remove_batches: Vec<(String, Vec<String>)>,
    created: Vec<NewPlaylist>,
}

/// In-memory catalog. Search answers are keyed by exact query string.
pub struct FakeCatalog {
    user: UserProfile,
    results: HashMap<String, Vec<ResolvedTrack>>,
    failing_queries: HashSet<String>,
    state: Mutex<State>,
    next_id: AtomicUsize,
    pub fail_current_user: bool,
    pub fail_playlist_listing: bool,
    pub fail_create: bool,
    pub fail_track_listing: bool,
    /// Fail the add call with this zero-based index.
    pub fail_add_at: Option<usize>,
    add_calls: AtomicUsize,
    /// Fail the remove call with this zero-based index.
    pub fail_remove_at: Option<usize>,
    remove_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(user_id: &str) -> Self {
        Self {
            user: UserProfile {
                id: user_id.to_string(),
                },
            results: HashMap::new(),
            failing_queries: HashSet::new(),
            state: Mutex::new(State::default()),
            next_id: AtomicUsize::new(1),
            fail_current_user: false,
            fail_playlist_listing: false,
            fail_create: false,
            fail_track_listing: false,
            fail_add_at: None,
            add_calls: AtomicUsize::new(0),
            fail_remove_at: None,
            remove_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_results(mut self, query: &str, tracks: Vec<ResolvedTrack>) -> Self {
        self.results.insert(query.to_string(), tracks);
        self
    }

    pub fn with_failing_query(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }

    pub fn with_playlist(self, id: &str, name: &str, owner: &str, tracks: Vec<ResolvedTrack>) -> Self {
        self.state.lock().unwrap().playlists.push(StoredPlaylist {
            identity: PlaylistIdentity {
                id: id.to_string(),
                name: name.to_string(),
                description: String::new(),
                owner_id: owner.to_string(),
                track_count: tracks.len() as u32,
                public: false,
                url: None,
            },
            tracks,
            others: Vec::new(),
        });
        self
    }

    /// Appends non-track entries to an existing playlist.
    pub fn with_other_entries(self, playlist_id: &str, entries: Vec<Option<&str>>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let p = state
                .playlists
                .iter_mut()
                .find(|p| p.identity.id == playlist_id)
                .unwrap();
            p.others
                .extend(entries.into_iter().map(|e| e.map(str::to_string)));
            p.identity.track_count = p.entry_count();
        }
        self
    }

    pub fn other_entries(&self, id: &str) -> Vec<Option<String>> {
        self.state
            .lock()
            .unwrap()
            .playlists
            .iter()
            .find(|p| p.identity.id == id)
            .map(|p| p.others.clone())
            .unwrap_or_default()
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn add_batches(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().add_batches.clone()
    }

    pub fn remove_batches(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().remove_batches.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .created
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn playlist_uris(&self, id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .playlists
            .iter()
            .find(|p| p.identity.id == id)
            .map(|p| p.tracks.iter().map(|t| t.uri.clone()).collect())
            .unwrap_or_default()
    }

    pub fn playlist_count(&self) -> usize {
        self.state.lock().unwrap().playlists.len()
    }
}

fn page<T: Clone>(items: &[T], offset: u32, limit: u32) -> Page<T> {
    let slice: Vec<T> = items
        .iter()
        .skip(offset as usize)
        .take(limit as usize)
        .cloned()
        .collect();
    Page::new(slice)
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn current_user(&self) -> Result<UserProfile, CatalogError> {
        if self.fail_current_user {
            return Err(failure("me unavailable"));
        }
        Ok(self.user.clone())
    }

    async fn user_playlists(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistIdentity>, CatalogError> {
        if self.fail_playlist_listing {
            return Err(failure("playlists unavailable"));
        }
        let state = self.state.lock().unwrap();
        let all: Vec<PlaylistIdentity> = state.playlists.iter().map(|p| p.identity.clone()).collect();
        Ok(page(&all, offset, limit))
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<PlaylistIdentity, CatalogError> {
        if self.fail_create {
            return Err(failure("create refused"));
        }
        let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let identity = PlaylistIdentity {
            id,
            name: playlist.name.clone(),
            description: playlist.description.clone(),
            owner_id: user_id.to_string(),
            track_count: 0,
            public: playlist.public,
            url: None,
        };
        let mut state = self.state.lock().unwrap();
        state.created.push(playlist.clone());
        state.playlists.push(StoredPlaylist {
            identity: identity.clone(),
            tracks: Vec::new(),
            others: Vec::new(),
        });
        Ok(identity)
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ResolvedTrack>, CatalogError> {
        if self.fail_track_listing {
            return Err(failure("tracks unavailable"));
        }
        let state = self.state.lock().unwrap();
        let tracks = state
            .playlists
            .iter()
            .find(|p| p.identity.id == playlist_id)
            .map(|p| p.tracks.clone())
            .unwrap_or_default();
        Ok(page(&tracks, offset, limit))
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        let call = self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_add_at == Some(call) {
            return Err(failure("add refused"));
        }
        if uris.len() > 100 {
            return Err(CatalogError::BatchTooLarge {
                size: uris.len(),
                limit: 100,
            });
        }

        let mut state = self.state.lock().unwrap();
        state
            .add_batches
            .push((playlist_id.to_string(), uris.to_vec()));
        if let Some(p) = state
            .playlists
            .iter_mut()
            .find(|p| p.identity.id == playlist_id)
        {
            for uri in uris {
                let id = uri.trim_start_matches("spotify:track:");
                p.tracks.push(track(id, id, "added"));
            }
            p.identity.track_count = p.entry_count();
        }
        Ok(())
    }

    async fn playlist_item_uris(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Option<String>>, CatalogError> {
        if self.fail_track_listing {
            return Err(failure("tracks unavailable"));
        }
        let state = self.state.lock().unwrap();
        let entries: Vec<Option<String>> = state
            .playlists
            .iter()
            .find(|p| p.identity.id == playlist_id)
            .map(|p| {
                p.tracks
                    .iter()
                    .map(|t| Some(t.uri.clone()))
                    .chain(p.others.iter().cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(page(&entries, offset, limit))
    }

    async fn remove_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        let call = self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove_at == Some(call) {
            return Err(failure("remove refused"));
        }

        let mut state = self.state.lock().unwrap();
        state
            .remove_batches
            .push((playlist_id.to_string(), uris.to_vec()));
        if let Some(p) = state
            .playlists
            .iter_mut()
            .find(|p| p.identity.id == playlist_id)
        {
            p.tracks.retain(|t| !uris.contains(&t.uri));
            p.others
                .retain(|e| e.as_ref().is_none_or(|uri| !uris.contains(uri)));
            p.identity.track_count = p.entry_count();
        }
        Ok(())
    }

    async fn search_tracks(
        &self,
        query: &str,
        _limit: u32,
    ) -> Result<Vec<ResolvedTrack>, CatalogError> {
        self.state.lock().unwrap().searches.push(query.to_string());
        if self.failing_queries.contains(query) {
            return Err(failure("search failed"));
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

/// Token exchange that records the code it was asked to redeem.
pub struct FakeExchange {
    pub fail: bool,
    pub codes: Mutex<Vec<(String, String)>>,
}

impl FakeExchange {
    pub fn ok() -> Self {
        Self {
            fail: false,
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            codes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TokenExchange for FakeExchange {
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Token, AuthError> {
        self.codes
            .lock()
            .unwrap()
            .push((code.to_string(), code_verifier.to_string()));
        if self.fail {
            return Err(AuthError::Exchange("invalid_grant".to_string()));
        }
        Ok(Token {
            access_token: format!("access-for-{}", code),
            refresh_token: "refresh".to_string(),
            scope: "playlist-modify-private".to_string(),
            expires_in: 3600,
            obtained_at: 0,
        })
    }
}
