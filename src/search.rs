//! Track search: query building, page walking and artist enrichment.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::api::dto::{FullArtist, FullTrack, TrackPage};
use crate::context::RequestContext;
use crate::error::Error;
use crate::mapper::map_track;
use crate::models::Track;
use crate::researcher::Researcher;
use crate::session::SessionCache;

pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub genre_filters: Vec<String>,
    pub limit: u32,
}

impl Query {
    /// Validate caller input. Non-positive limits select [`DEFAULT_SEARCH_LIMIT`].
    pub fn new(text: &str, genre_filters: &[String], limit: i64) -> Result<Self, Error> {
        if text.is_empty() {
            return Err(Error::Validation("empty query".into()));
        }
        let limit = if limit <= 0 {
            DEFAULT_SEARCH_LIMIT
        } else {
            u32::try_from(limit).unwrap_or(u32::MAX)
        };
        Ok(Self {
            text: text.to_string(),
            genre_filters: genre_filters.to_vec(),
            limit,
        })
    }

    /// The provider query: base text plus one ` genre:<value>` per filter, in order.
    pub fn effective_text(&self) -> String {
        let mut query = self.text.clone();
        for genre in &self.genre_filters {
            query.push_str(" genre:");
            query.push_str(genre);
        }
        query
    }
}

/// Full artist records fetched during one search, keyed by artist id and kept
/// in fetch order. Never outlives the search that created it.
#[derive(Debug, Default)]
pub(crate) struct ArtistBuffer {
    artists: Vec<FullArtist>,
    index: HashMap<String, usize>,
}

impl ArtistBuffer {
    pub(crate) fn get(&self, artist_id: &str) -> Option<&FullArtist> {
        self.index.get(artist_id).map(|&i| &self.artists[i])
    }

    pub(crate) fn push(&mut self, artist: FullArtist) {
        if self.index.contains_key(&artist.id) {
            return;
        }
        self.index.insert(artist.id.clone(), self.artists.len());
        self.artists.push(artist);
    }

    pub(crate) fn len(&self) -> usize {
        self.artists.len()
    }
}

impl Researcher {
    /// Search tracks matching `query`, optionally narrowed by genres.
    ///
    /// Walks every result page and resolves each track's artists, fetching
    /// each distinct artist at most once per call. Any failure discards the
    /// tracks gathered so far.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        query: &str,
        genre_filters: &[String],
        limit: i64,
    ) -> Result<Vec<Track>, Error> {
        let query = Query::new(query, genre_filters, limit)?;
        let client = self.sessions.get_session(ctx).await?;

        let effective = query.effective_text();
        info!("querying spotify with query `{}`", effective);
        let first = ctx
            .run("client.Search", client.search_tracks(&effective, query.limit))
            .await?
            .map_err(|e| Error::provider("client.Search", e))?;

        let tracks = walk_pages(ctx, &self.sessions, first).await?;
        debug!("search `{}` returned {} tracks", effective, tracks.len());
        Ok(tracks)
    }
}

/// Every provider call below asks the cache for a handle first, so a walk
/// that outlives the token refreshes it instead of using it past expiry.
async fn walk_pages(
    ctx: &RequestContext,
    sessions: &SessionCache,
    first: TrackPage,
) -> Result<Vec<Track>, Error> {
    let mut tracks = Vec::new();
    let mut buffer = ArtistBuffer::default();
    let mut followed: HashSet<String> = HashSet::new();
    let mut page = first;

    loop {
        for raw in &page.items {
            let artists = resolve_artists(ctx, sessions, raw, &mut buffer).await?;
            tracks.push(map_track(raw, &artists));
        }

        if let Some(cursor) = page.next.as_deref() {
            if !followed.insert(cursor.to_string()) {
                warn!("page cursor {} repeated, ending walk", cursor);
                break;
            }
        }

        let client = sessions.get_session(ctx).await?;
        let next = ctx
            .run("client.NextPage", client.next_page(&page))
            .await?
            .map_err(|e| Error::provider("client.NextPage", e))?;
        match next {
            Some(next) => page = next,
            None => break,
        }
    }

    debug!("resolved {} distinct artists", buffer.len());
    Ok(tracks)
}

async fn resolve_artists(
    ctx: &RequestContext,
    sessions: &SessionCache,
    track: &FullTrack,
    buffer: &mut ArtistBuffer,
) -> Result<Vec<FullArtist>, Error> {
    let mut out = Vec::with_capacity(track.artists.len());
    for artist in &track.artists {
        if let Some(known) = buffer.get(&artist.id) {
            out.push(known.clone());
            continue;
        }
        let client = sessions.get_session(ctx).await?;
        let full = ctx
            .run("client.GetArtist", client.get_artist(&artist.id))
            .await?
            .map_err(|e| Error::provider("client.GetArtist", e))?;
        buffer.push(full.clone());
        out.push(full);
    }
    Ok(out)
}
