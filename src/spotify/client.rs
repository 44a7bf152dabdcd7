use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use url::Url;

use crate::{
    config::MAX_BATCH_SIZE,
    error::CatalogError,
    spotify::catalog::Catalog,
    types::{
        AddTracksToPlaylistRequest, CreatePlaylistRequest, NewPlaylist, Page, PagingObject,
        PlaylistIdentity, PlaylistItem, PlaylistObject, RemoveTracksFromPlaylistRequest,
        ResolvedTrack, SearchResponse, SnapshotResponse, TrackUri, UserProfile,
    },
    warning,
};

const MAX_ATTEMPTS: u32 = 5;
const MAX_RETRY_AFTER_SECS: u64 = 120;
const BAD_GATEWAY_DELAY: Duration = Duration::from_secs(10);

/// Authenticated handle to the Spotify Web API.
///
/// Built from an access token obtained by the authorization flow and passed
/// by reference to whatever needs the catalog; it holds no mutable state, so
/// one handle serves any number of reconciliations.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(api_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn user_playlists_url(&self, user_id: &str) -> Result<Url, CatalogError> {
        let mut url =
            Url::parse(&self.api_url).map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(["users", user_id, "playlists"]);
        Ok(url)
    }

    /// Sends a request built by `build`, honouring Spotify's rate limiting.
    ///
    /// `429` waits for `Retry-After` (up to 120 s) and retries; `502`/`503`
    /// wait 10 s and retry. Gives up after five attempts.
    async fn send<F>(&self, build: F) -> Result<Response, CatalogError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        for _ in 0..MAX_ATTEMPTS {
            let response = build(&self.http)
                .bearer_auth(&self.access_token)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                if retry_after > MAX_RETRY_AFTER_SECS {
                    warning!(
                        "Retry after has reached an abnormal high of {} seconds.",
                        retry_after
                    );
                    return Err(CatalogError::RateLimited { retry_after });
                }
                sleep(Duration::from_secs(retry_after)).await;
                continue;
            }

            if status == StatusCode::BAD_GATEWAY || status == StatusCode::SERVICE_UNAVAILABLE {
                sleep(BAD_GATEWAY_DELAY).await;
                continue;
            }

            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Err(CatalogError::Unavailable {
            attempts: MAX_ATTEMPTS,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = self.url(path);
        let response = self.send(|c| c.get(&url).query(query)).await?;
        Ok(response.json::<T>().await?)
    }
}

fn check_batch(uris: &[String]) -> Result<(), CatalogError> {
    if uris.len() > MAX_BATCH_SIZE {
        return Err(CatalogError::BatchTooLarge {
            size: uris.len(),
            limit: MAX_BATCH_SIZE,
        });
    }
    Ok(())
}

/// URI of every playlist entry, whatever it holds.
fn item_uris(items: Vec<PlaylistItem>) -> Vec<Option<String>> {
    items
        .into_iter()
        .map(|item| item.track.and_then(|t| t.uri))
        .collect()
}

#[async_trait]
impl Catalog for SpotifyClient {
    async fn current_user(&self) -> Result<UserProfile, CatalogError> {
        self.get_json("/me", &[]).await
    }

    async fn user_playlists(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistIdentity>, CatalogError> {
        let page: PagingObject<PlaylistObject> = self
            .get_json(
                "/me/playlists",
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
            .await?;

        Ok(Page::new(page.items.into_iter().map(PlaylistIdentity::from).collect()))
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<PlaylistIdentity, CatalogError> {
        let url = self.user_playlists_url(user_id)?;
        let body = CreatePlaylistRequest {
            name: playlist.name.clone(),
            description: playlist.description.clone(),
            public: playlist.public,
            collaborative: playlist.collaborative,
        };

        let response = self.send(|c| c.post(url.clone()).json(&body)).await?;
        let created = response.json::<PlaylistObject>().await?;
        Ok(created.into())
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ResolvedTrack>, CatalogError> {
        let page: PagingObject<PlaylistItem> = self
            .get_json(
                &format!("/playlists/{}/tracks", playlist_id),
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
            .await?;

        let received = page.items.len();
        let tracks = page
            .items
            .into_iter()
            .filter_map(|item| item.track.and_then(|t| t.into_resolved()))
            .collect();

        Ok(Page::filtered(tracks, received))
    }

    async fn playlist_item_uris(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Option<String>>, CatalogError> {
        let page: PagingObject<PlaylistItem> = self
            .get_json(
                &format!("/playlists/{}/tracks", playlist_id),
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
            .await?;

        Ok(Page::new(item_uris(page.items)))
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        check_batch(uris)?;
        let url = self.url(&format!("/playlists/{}/tracks", playlist_id));
        let body = AddTracksToPlaylistRequest {
            uris: uris.to_vec(),
        };

        let response = self.send(|c| c.post(&url).json(&body)).await?;
        response.json::<SnapshotResponse>().await?;
        Ok(())
    }

    async fn remove_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), CatalogError> {
        check_batch(uris)?;
        let url = self.url(&format!("/playlists/{}/tracks", playlist_id));
        let body = RemoveTracksFromPlaylistRequest {
            tracks: uris.iter().map(|uri| TrackUri { uri: uri.clone() }).collect(),
        };

        let response = self.send(|c| c.delete(&url).json(&body)).await?;
        response.json::<SnapshotResponse>().await?;
        Ok(())
    }

    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<ResolvedTrack>, CatalogError> {
        let response: SearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(response
            .tracks
            .map(|page| {
                page.items
                    .into_iter()
                    .filter_map(|t| t.into_resolved())
                    .collect()
            })
            .unwrap_or_default())
    }
}
