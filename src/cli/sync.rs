use std::path::Path;

use tabled::Table;

use crate::{
    Res,
    cli::auth::access_token,
    config::Config,
    info,
    spotify::{client::SpotifyClient, playlist::PlaylistReconciler},
    success,
    types::{PlaylistRequest, SearchResult, SearchResultTableRow, Song},
    utils, warning,
};

const DEFAULT_DESCRIPTION: &str = "Created by setlist";

/// Options of `setlist sync`.
#[derive(Debug, Clone)]
pub struct SyncOptions<'a> {
    pub file: &'a Path,
    pub name: Option<String>,
    pub description: Option<String>,
    pub force_create: bool,
}

pub async fn sync(config: &Config, opts: SyncOptions<'_>) -> Res<()> {
    let request = load_request(opts.file, opts.name, opts.description).await?;
    if request.songs.is_empty() {
        warning!("No songs found in {}", opts.file.display());
        return Ok(());
    }

    let token = access_token(config).await?;
    let client = SpotifyClient::new(&config.api_url, token);
    let reconciler = PlaylistReconciler::new(&client, config.limits);

    match reconciler.reconcile(&request, opts.force_create).await {
        Ok(outcome) => {
            print_report(&outcome.results);
            for w in &outcome.warnings {
                warning!("{}", w);
            }
            let found = outcome.results.iter().filter(|r| r.found()).count();
            success!(
                "Playlist '{}' {} with {}/{} songs",
                outcome.playlist.name,
                if outcome.reused { "updated" } else { "created" },
                found,
                outcome.results.len()
            );
            if let Some(url) = &outcome.playlist.url {
                info!("{}", url);
            }
            Ok(())
        }
        Err(e) => {
            if !e.partial.is_empty() {
                warning!("Sync aborted, songs resolved so far:");
                print_report(&e.partial);
            }
            Err(e.into())
        }
    }
}

/// Reads the song list at `path`: `.json` files hold a full playlist
/// request, anything else is a plain-text list.
pub async fn load_request(
    path: &Path,
    name: Option<String>,
    description: Option<String>,
) -> Res<PlaylistRequest> {
    let content = async_fs::read_to_string(path).await?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let mut request = if is_json {
        serde_json::from_str::<PlaylistRequest>(&content)?
    } else {
        let songs: Vec<Song> = utils::parse_song_list(&content);
        PlaylistRequest {
            playlist_name: utils::playlist_name_from_path(path),
            description: DEFAULT_DESCRIPTION.to_string(),
            songs,
        }
    };

    if let Some(name) = name {
        request.playlist_name = name;
    }
    if let Some(description) = description {
        request.description = description;
    }
    Ok(request)
}

fn print_report(results: &[SearchResult]) {
    let rows: Vec<SearchResultTableRow> = results
        .iter()
        .map(|r| SearchResultTableRow {
            status: if r.found() { "found" } else { "missing" }.to_string(),
            requested: r.query.clone(),
            matched: r
                .track
                .as_ref()
                .map(|t| format!("{} - {}", t.primary_artist, t.title))
                .unwrap_or_default(),
        })
        .collect();

    let table = Table::new(rows);
    println!("{}", table);
}
