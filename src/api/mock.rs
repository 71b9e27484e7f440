//! In-memory test doubles for the catalog client and the token provider.
//!
//! Both count their calls so tests can assert exactly how often the network
//! would have been hit.

use super::dto::{FullArtist, TrackPage};
use super::{AuthSession, CatalogClient, Credentials, TokenProvider};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const PAGE_CURSOR_PREFIX: &str = "mock://page/";

/// Scripted catalog: every search is answered with the same page sequence,
/// artists come from a map.
///
/// Pages are chained through their `next` cursor like the real provider's,
/// so the mock keeps no paging state between searches.
#[derive(Default)]
pub struct MockCatalog {
    pages: Vec<TrackPage>,
    artists: HashMap<String, FullArtist>,
    failing_artists: HashMap<String, String>,
    genres: Vec<String>,
    genre_error: Option<String>,
    search_error: Option<String>,
    next_page_error: Option<String>,
    repeat_last_page: bool,
    delay: Option<Duration>,
    queries: Mutex<Vec<(String, u32)>>,
    artist_calls: Mutex<Vec<String>>,
    next_page_calls: AtomicUsize,
    genre_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these pages, first one from `search_tracks`, the rest from `next_page`.
    pub fn with_pages(mut self, pages: Vec<TrackPage>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_artist(mut self, artist: FullArtist) -> Self {
        self.artists.insert(artist.id.clone(), artist);
        self
    }

    pub fn with_failing_artist(mut self, artist_id: &str, message: &str) -> Self {
        self.failing_artists
            .insert(artist_id.to_string(), message.to_string());
        self
    }

    pub fn with_genres(mut self, genres: Vec<String>) -> Self {
        self.genres = genres;
        self
    }

    pub fn with_genre_error(mut self, message: &str) -> Self {
        self.genre_error = Some(message.to_string());
        self
    }

    pub fn with_search_error(mut self, message: &str) -> Self {
        self.search_error = Some(message.to_string());
        self
    }

    pub fn with_next_page_error(mut self, message: &str) -> Self {
        self.next_page_error = Some(message.to_string());
        self
    }

    /// Point the last page's cursor back at itself, like a provider that never
    /// reports the end of its results.
    pub fn with_repeating_last_page(mut self) -> Self {
        self.repeat_last_page = true;
        self
    }

    /// Make every call sleep first, to exercise cancellation and deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queries passed to `search_tracks`, with their limits.
    pub fn queries(&self) -> Vec<(String, u32)> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Artist ids passed to `get_artist`, in call order.
    pub fn artist_calls(&self) -> Vec<String> {
        self.artist_calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn artist_call_count(&self, artist_id: &str) -> usize {
        self.artist_calls()
            .iter()
            .filter(|id| id.as_str() == artist_id)
            .count()
    }

    pub fn search_call_count(&self) -> usize {
        self.queries().len()
    }

    pub fn next_page_call_count(&self) -> usize {
        self.next_page_calls.load(Ordering::SeqCst)
    }

    pub fn genre_call_count(&self) -> usize {
        self.genre_calls.load(Ordering::SeqCst)
    }

    /// Total number of catalog calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.search_call_count()
            + self.artist_calls().len()
            + self.next_page_call_count()
            + self.genre_call_count()
    }

    async fn pause(&self) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }

    fn page_at(&self, index: usize) -> Option<TrackPage> {
        let mut page = self.pages.get(index)?.clone();
        let next = if index + 1 < self.pages.len() {
            Some(index + 1)
        } else if self.repeat_last_page {
            Some(index)
        } else {
            None
        };
        page.next = next.map(|i| format!("{}{}", PAGE_CURSOR_PREFIX, i));
        Some(page)
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<TrackPage> {
        info!("MockCatalog: search {} (limit {})", query, limit);
        if let Ok(mut q) = self.queries.lock() {
            q.push((query.to_string(), limit));
        }
        self.pause().await;
        if let Some(msg) = &self.search_error {
            return Err(anyhow!(msg.clone()));
        }
        Ok(self.page_at(0).unwrap_or_default())
    }

    async fn next_page(&self, page: &TrackPage) -> Result<Option<TrackPage>> {
        self.next_page_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(msg) = &self.next_page_error {
            return Err(anyhow!(msg.clone()));
        }
        let Some(cursor) = page.next.as_deref() else {
            return Ok(None);
        };
        let index: usize = cursor
            .strip_prefix(PAGE_CURSOR_PREFIX)
            .and_then(|i| i.parse().ok())
            .ok_or_else(|| anyhow!("unknown page cursor {}", cursor))?;
        Ok(self.page_at(index))
    }

    async fn get_artist(&self, artist_id: &str) -> Result<FullArtist> {
        if let Ok(mut c) = self.artist_calls.lock() {
            c.push(artist_id.to_string());
        }
        self.pause().await;
        if let Some(msg) = self.failing_artists.get(artist_id) {
            return Err(anyhow!(msg.clone()));
        }
        self.artists
            .get(artist_id)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found => no artist {}", artist_id))
    }

    async fn get_available_genre_seeds(&self) -> Result<Vec<String>> {
        self.genre_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(msg) = &self.genre_error {
            return Err(anyhow!(msg.clone()));
        }
        Ok(self.genres.clone())
    }
}

/// Hands out sessions wrapping a shared catalog, expiring `lifetime` after
/// each exchange. Failures can be scripted per call.
pub struct MockTokenProvider {
    catalog: Arc<dyn CatalogClient>,
    lifetime: Duration,
    delay: Option<Duration>,
    failures: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Credentials>>,
}

impl MockTokenProvider {
    pub fn new(catalog: Arc<dyn CatalogClient>, lifetime: Duration) -> Self {
        Self {
            catalog,
            lifetime,
            delay: None,
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Simulate a slow token endpoint.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next exchange with `message`. Queued failures are consumed in order.
    pub fn fail_next(&self, message: &str) {
        if let Ok(mut f) = self.failures.lock() {
            f.push_back(message.to_string());
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Credentials received, one entry per exchange.
    pub fn credentials_seen(&self) -> Vec<Credentials> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn new_session(&self, credentials: &Credentials) -> Result<AuthSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut s) = self.seen.lock() {
            s.push(credentials.clone());
        }
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let failure = self.failures.lock().ok().and_then(|mut f| f.pop_front());
        if let Some(msg) = failure {
            return Err(anyhow!(msg));
        }
        Ok(AuthSession::new(
            self.catalog.clone(),
            Instant::now() + self.lifetime,
        ))
    }
}
