use std::collections::HashSet;

use crate::{
    config::{Limits, MAX_BATCH_SIZE},
    error::{CatalogError, ReconcileError, ReconcileFailure},
    info,
    spotify::{
        catalog::Catalog,
        pagination::PaginatedCollector,
        search::{ConfidentOrFirst, MatchPolicy, TrackResolver},
    },
    success,
    types::{NewPlaylist, PlaylistIdentity, PlaylistRequest, Reconciliation, SearchResult},
    warning,
};

const LOCAL_URI_PREFIX: &str = "spotify:local:";

/// Brings a named playlist in line with a desired song list.
///
/// The reconciler borrows an authenticated catalog handle for the duration
/// of each call. A call either reuses the user's playlist with the same
/// name (clearing it first) or creates a new private one, then resolves
/// every song in input order and adds the resolved tracks in batches.
pub struct PlaylistReconciler<'a, C: Catalog + ?Sized, P: MatchPolicy = ConfidentOrFirst> {
    catalog: &'a C,
    resolver: TrackResolver<'a, C, P>,
    limits: Limits,
}

impl<'a, C: Catalog + ?Sized> PlaylistReconciler<'a, C, ConfidentOrFirst> {
    pub fn new(catalog: &'a C, limits: Limits) -> Self {
        Self {
            catalog,
            resolver: TrackResolver::new(catalog, limits.search_limit),
            limits,
        }
    }
}

impl<'a, C: Catalog + ?Sized, P: MatchPolicy> PlaylistReconciler<'a, C, P> {
    pub fn with_resolver(catalog: &'a C, resolver: TrackResolver<'a, C, P>, limits: Limits) -> Self {
        Self {
            catalog,
            resolver,
            limits,
        }
    }

    fn batch_size(&self) -> usize {
        self.limits.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    /// Creates or refreshes the playlist described by `request`.
    ///
    /// With `force_create` an existing playlist of the same name is left
    /// alone and a new one is created.
    ///
    /// # Errors
    ///
    /// Fails when the current user cannot be read, the playlist cannot be
    /// created or a track batch cannot be added. The error carries every
    /// [`SearchResult`] produced before the failure. Lookup and clearing
    /// problems are not fatal; they end up in [`Reconciliation::warnings`].
    pub async fn reconcile(
        &self,
        request: &PlaylistRequest,
        force_create: bool,
    ) -> Result<Reconciliation, ReconcileError> {
        let mut warnings: Vec<String> = Vec::new();

        let user = self
            .catalog
            .current_user()
            .await
            .map_err(|e| ReconcileError::new(ReconcileFailure::CurrentUser(e), Vec::new()))?;

        let existing = if force_create {
            None
        } else {
            match self.find_playlist(&user.id, &request.playlist_name).await {
                Ok(found) => found,
                Err(e) => {
                    let msg = format!(
                        "Failed to look up existing playlist '{}': {}",
                        request.playlist_name, e
                    );
                    warning!("{}", msg);
                    warnings.push(msg);
                    None
                }
            }
        };

        let reused = existing.is_some();
        let mut playlist = match existing {
            Some(mut playlist) => {
                info!("Updating existing playlist '{}'", playlist.name);
                match self.clear_playlist(&mut playlist).await {
                    Ok(0) => {}
                    Ok(kept) => {
                        let msg = format!(
                            "{} entries of playlist '{}' have no URI and were kept",
                            kept, playlist.name
                        );
                        warning!("{}", msg);
                        warnings.push(msg);
                    }
                    Err(e) => {
                        let msg = format!("Failed to clear playlist '{}': {}", playlist.name, e);
                        warning!("{}", msg);
                        warnings.push(msg);
                    }
                }
                playlist
            }
            None => {
                let new_playlist = NewPlaylist {
                    name: request.playlist_name.clone(),
                    description: request.description.clone(),
                    public: false,
                    collaborative: false,
                };
                let created = self
                    .catalog
                    .create_playlist(&user.id, &new_playlist)
                    .await
                    .map_err(|e| {
                        ReconcileError::new(ReconcileFailure::CreatePlaylist(e), Vec::new())
                    })?;
                success!("Created playlist '{}'", created.name);
                created
            }
        };

        let results = self.resolve_songs(request).await;

        let uris: Vec<String> = results
            .iter()
            .filter_map(|r| r.track.as_ref().map(|t| t.uri.clone()))
            .collect();

        let mut added = 0;
        for batch in uris.chunks(self.batch_size()) {
            if let Err(source) = self.catalog.add_tracks(&playlist.id, batch).await {
                return Err(ReconcileError::new(
                    ReconcileFailure::AddTracks {
                        playlist_id: playlist.id.clone(),
                        added,
                        source,
                    },
                    results,
                ));
            }
            added += batch.len();
        }
        playlist.track_count = playlist.track_count.saturating_add(added as u32);

        Ok(Reconciliation {
            playlist,
            results,
            reused,
            warnings,
        })
    }

    /// First playlist owned by `user_id` whose name matches exactly, in
    /// traversal order.
    pub async fn find_playlist(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<PlaylistIdentity>, CatalogError> {
        let collector = PaginatedCollector::new(
            self.limits.playlist_page_size,
            self.limits.playlist_scan_cap,
        );
        let playlists = collector
            .collect(|offset, limit| self.catalog.user_playlists(offset, limit))
            .await?;

        Ok(playlists
            .into_iter()
            .find(|p| p.name == name && p.owner_id == user_id))
    }

    /// Removes every entry of the playlist in batches, local files and
    /// episodes included. Returns how many entries carried no URI and were
    /// left in place. On failure the entries of batches that were already
    /// removed stay removed.
    async fn clear_playlist(&self, playlist: &mut PlaylistIdentity) -> Result<usize, CatalogError> {
        let collector =
            PaginatedCollector::new(self.limits.track_page_size, self.limits.track_scan_cap);
        let playlist_id = playlist.id.clone();
        let entries = collector
            .collect(|offset, limit| self.catalog.playlist_item_uris(&playlist_id, offset, limit))
            .await?;

        let kept = entries.iter().filter(|uri| uri.is_none()).count();
        let mut seen = HashSet::new();
        let mut uris: Vec<String> = entries
            .iter()
            .flatten()
            .filter(|uri| seen.insert(uri.as_str()))
            .cloned()
            .collect();
        // local files last
        uris.sort_by_key(|uri| uri.starts_with(LOCAL_URI_PREFIX));

        // a removal by uri drops every occurrence of that entry
        for batch in uris.chunks(self.batch_size()) {
            self.catalog.remove_tracks(&playlist.id, batch).await?;
            let removed = entries.iter().flatten().filter(|uri| batch.contains(uri)).count();
            playlist.track_count = playlist.track_count.saturating_sub(removed as u32);
        }
        if !uris.is_empty() {
            info!("Removed {} tracks from '{}'", uris.len(), playlist.name);
        }
        Ok(kept)
    }

    async fn resolve_songs(&self, request: &PlaylistRequest) -> Vec<SearchResult> {
        let total = request.songs.len();
        info!("Searching for {} songs...", total);

        let mut results = Vec::with_capacity(total);
        for (i, song) in request.songs.iter().enumerate() {
            info!(
                "[{}/{}] Searching for: {} - {}",
                i + 1,
                total,
                song.artist,
                song.title
            );

            let result = self.resolver.resolve(song).await;
            match &result.track {
                Some(track) => success!("Found: {} - {}", track.primary_artist, track.title),
                None => warning!("Not found: {} - {}", song.artist, song.title),
            }
            results.push(result);
        }
        results
    }
}
