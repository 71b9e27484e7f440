pub mod dto;
pub mod mock;
pub mod spotify;
pub mod spotify_auth;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tokio::time::Instant;

use dto::{FullArtist, TrackPage};

/// Catalog operations the search pipeline and genre listing need.
/// Implementations: spotify::SpotifyClient and mock::MockCatalog.
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Search tracks matching `query`, returning the first page of results.
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<TrackPage>;

    /// Fetch the page following `page`. `Ok(None)` means there are no more pages.
    async fn next_page(&self, page: &TrackPage) -> Result<Option<TrackPage>>;

    /// Fetch the full artist record for `artist_id`.
    async fn get_artist(&self, artist_id: &str) -> Result<FullArtist>;

    /// List the genre seeds the provider accepts.
    async fn get_available_genre_seeds(&self) -> Result<Vec<String>>;
}

/// Exchanges client credentials for an authenticated catalog handle.
/// Implementations: spotify_auth::SpotifyTokenProvider and mock::MockTokenProvider.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn new_session(&self, credentials: &Credentials) -> Result<AuthSession>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// An authenticated catalog handle and the instant its token stops being valid.
#[derive(Clone)]
pub struct AuthSession {
    pub client: Arc<dyn CatalogClient>,
    pub expires_at: Instant,
}

impl AuthSession {
    pub fn new(client: Arc<dyn CatalogClient>, expires_at: Instant) -> Self {
        Self { client, expires_at }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
