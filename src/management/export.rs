use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use crate::{
    config::Limits,
    error::{CatalogError, ExportError},
    info,
    spotify::{catalog::Catalog, pagination::PaginatedCollector},
    success,
    types::{PlaylistIdentity, ResolvedTrack},
    utils, warning,
};

/// Result of exporting several playlists.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub exported: Vec<PathBuf>,
    /// Playlist name and the reason it could not be exported.
    pub failed: Vec<(String, String)>,
}

/// Writes playlists to plain-text files that `setlist sync --file` reads
/// back.
pub struct PlaylistExporter<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    limits: Limits,
}

impl<'a, C: Catalog + ?Sized> PlaylistExporter<'a, C> {
    pub fn new(catalog: &'a C, limits: Limits) -> Self {
        Self { catalog, limits }
    }

    /// Exports every playlist of the current user. A playlist that fails is
    /// recorded in the summary and the rest are still exported.
    pub async fn export_all(&self, dir: &Path) -> Result<ExportSummary, ExportError> {
        let playlists = self.playlists().await?;
        let mut summary = ExportSummary::default();

        if playlists.is_empty() {
            info!("No playlists found to export");
            return Ok(summary);
        }

        async_fs::create_dir_all(dir).await?;
        info!("Found {} playlists to export", playlists.len());

        for playlist in &playlists {
            info!(
                "Exporting: {} ({} tracks)",
                playlist.name, playlist.track_count
            );
            match self.export_playlist(playlist, dir).await {
                Ok(path) => {
                    success!("Exported to {}", path.display());
                    summary.exported.push(path);
                }
                Err(e) => {
                    warning!("Failed to export '{}': {}", playlist.name, e);
                    summary.failed.push((playlist.name.clone(), e.to_string()));
                }
            }
        }

        Ok(summary)
    }

    /// Exports the first playlist whose name matches `name` exactly.
    pub async fn export_named(&self, dir: &Path, name: &str) -> Result<PathBuf, ExportError> {
        let playlist = self
            .playlists()
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ExportError::NotFound(name.to_string()))?;

        async_fs::create_dir_all(dir).await?;
        self.export_playlist(&playlist, dir).await
    }

    async fn playlists(&self) -> Result<Vec<PlaylistIdentity>, CatalogError> {
        PaginatedCollector::new(self.limits.playlist_page_size, self.limits.playlist_scan_cap)
            .collect(|offset, limit| self.catalog.user_playlists(offset, limit))
            .await
    }

    async fn export_playlist(
        &self,
        playlist: &PlaylistIdentity,
        dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let tracks = PaginatedCollector::new(self.limits.track_page_size, self.limits.track_scan_cap)
            .collect(|offset, limit| self.catalog.playlist_tracks(&playlist.id, offset, limit))
            .await?;

        let path = dir.join(format!("{}.txt", utils::sanitize_filename(&playlist.name)));
        async_fs::write(&path, render(playlist, &tracks)).await?;
        Ok(path)
    }
}

/// Text form of a playlist: a `#` header followed by one
/// `Artist - Title` line per track.
pub fn render(playlist: &PlaylistIdentity, tracks: &[ResolvedTrack]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", playlist.name);
    if !playlist.description.is_empty() {
        let _ = writeln!(out, "# {}", playlist.description);
    }
    let _ = writeln!(out, "# {} tracks", tracks.len());
    let _ = writeln!(out, "# Exported from Spotify");
    out.push('\n');

    for track in tracks {
        let _ = writeln!(out, "{} - {}", track.primary_artist, track.title);
    }
    out
}
