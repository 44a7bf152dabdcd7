use crate::{
    spotify::catalog::Catalog,
    types::{ResolvedTrack, SearchResult, Song},
    utils, warning,
};

/// Decides which candidate, if any, a query's results resolve to.
///
/// Query escalation lives in [`TrackResolver`]; a policy only sees the
/// candidates of one non-empty query. Returning `None` makes the resolver
/// move on to the next query.
pub trait MatchPolicy: Send + Sync {
    fn select<'a>(&self, song: &Song, candidates: &'a [ResolvedTrack])
    -> Option<&'a ResolvedTrack>;
}

/// First confident match, otherwise the first raw candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidentOrFirst;

impl MatchPolicy for ConfidentOrFirst {
    fn select<'a>(
        &self,
        song: &Song,
        candidates: &'a [ResolvedTrack],
    ) -> Option<&'a ResolvedTrack> {
        candidates
            .iter()
            .find(|track| is_confident_match(song, track))
            .or_else(|| candidates.first())
    }
}

/// Only confident matches count.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidentOnly;

impl MatchPolicy for ConfidentOnly {
    fn select<'a>(
        &self,
        song: &Song,
        candidates: &'a [ResolvedTrack],
    ) -> Option<&'a ResolvedTrack> {
        candidates
            .iter()
            .find(|track| is_confident_match(song, track))
    }
}

/// True when one of the track's artists equals the requested artist and
/// the titles are equal or one contains the other, after trimming and
/// case folding.
pub fn is_confident_match(song: &Song, track: &ResolvedTrack) -> bool {
    let artist = utils::normalize(&song.artist);
    let title = utils::normalize(&song.title);
    let track_title = utils::normalize(&track.title);

    let artist_match = track
        .artists
        .iter()
        .any(|a| utils::normalize(a) == artist);

    let title_match =
        track_title == title || track_title.contains(&title) || title.contains(&track_title);

    artist_match && title_match
}

/// Search queries for a song, most specific first.
pub fn candidate_queries(song: &Song) -> Vec<String> {
    vec![
        format!("artist:{} track:{}", song.artist, song.title),
        format!("{} {}", song.artist, song.title),
        format!("track:{}", song.title),
    ]
}

/// Locates catalog tracks for free-text (artist, title) pairs.
///
/// Only read-only catalog queries are issued. Queries run strictly in the
/// order of [`candidate_queries`]; the first one that yields a pick per the
/// [`MatchPolicy`] wins. A failing query is logged and counts as empty.
pub struct TrackResolver<'a, C: Catalog + ?Sized, P: MatchPolicy = ConfidentOrFirst> {
    catalog: &'a C,
    policy: P,
    search_limit: u32,
}

impl<'a, C: Catalog + ?Sized> TrackResolver<'a, C, ConfidentOrFirst> {
    pub fn new(catalog: &'a C, search_limit: u32) -> Self {
        Self::with_policy(catalog, ConfidentOrFirst, search_limit)
    }
}

impl<'a, C: Catalog + ?Sized, P: MatchPolicy> TrackResolver<'a, C, P> {
    pub fn with_policy(catalog: &'a C, policy: P, search_limit: u32) -> Self {
        Self {
            catalog,
            policy,
            search_limit: search_limit.max(1),
        }
    }

    pub async fn resolve(&self, song: &Song) -> SearchResult {
        for query in candidate_queries(song) {
            let candidates = match self.catalog.search_tracks(&query, self.search_limit).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warning!("Search error for '{}': {}", query, e);
                    continue;
                }
            };

            if candidates.is_empty() {
                continue;
            }

            if let Some(track) = self.policy.select(song, &candidates) {
                return SearchResult {
                    query,
                    track: Some(track.clone()),
                    reason: song.reason.clone(),
                };
            }
        }

        SearchResult {
            query: format!("{} {}", song.artist, song.title),
            track: None,
            reason: song.reason.clone(),
        }
    }
}
