use super::dto::{FullArtist, GenreSeeds, SearchResponse, TrackPage};
use super::CatalogClient;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::env;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify Web API base URL. `SPOTIFY_API_BASE` overrides it (useful for tests).
pub fn api_base_from_env() -> String {
    env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.into())
}

/// Catalog client bound to one access token.
///
/// Built by the token provider after a successful exchange; it never refreshes
/// its own token, the session cache replaces the whole client instead.
pub struct SpotifyClient {
    client: Client,
    api_base: String,
    bearer: String,
}

impl SpotifyClient {
    pub fn new(client: Client, api_base: impl Into<String>, token_type: &str, access_token: &str) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bearer: format!("{} {}", token_type, access_token),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.bearer)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{} => {}", status, txt));
        }
        let body = resp
            .json::<T>()
            .await
            .with_context(|| format!("decoding response of GET {}", url))?;
        Ok(body)
    }
}

#[async_trait]
impl CatalogClient for SpotifyClient {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<TrackPage> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}",
            self.api_base,
            urlencoding::encode(query),
            limit
        );
        let results: SearchResponse = self.get_json(&url).await?;
        Ok(results.tracks)
    }

    async fn next_page(&self, page: &TrackPage) -> Result<Option<TrackPage>> {
        let Some(next) = page.next.as_deref() else {
            return Ok(None);
        };
        // Paging cursors from /search come back wrapped like the first page.
        let j: serde_json::Value = self.get_json(next).await?;
        let tracks = j.get("tracks").cloned().unwrap_or(j);
        let page: TrackPage =
            serde_json::from_value(tracks).map_err(|e| anyhow!("parse track page: {}", e))?;
        Ok(Some(page))
    }

    async fn get_artist(&self, artist_id: &str) -> Result<FullArtist> {
        let url = format!(
            "{}/artists/{}",
            self.api_base,
            urlencoding::encode(artist_id)
        );
        self.get_json(&url).await
    }

    async fn get_available_genre_seeds(&self) -> Result<Vec<String>> {
        let url = format!("{}/recommendations/available-genre-seeds", self.api_base);
        let seeds: GenreSeeds = self.get_json(&url).await?;
        Ok(seeds.genres)
    }
}
