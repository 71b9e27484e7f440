use std::sync::Arc;

use crate::api::spotify_auth::SpotifyTokenProvider;
use crate::api::{Credentials, TokenProvider};
use crate::session::SessionCache;

/// Entry point of the catalog integration: track search and genre listing,
/// both authenticated through one shared [`SessionCache`].
///
/// Cheap to share behind an `Arc`; all request state lives on the stack of
/// each call.
pub struct Researcher {
    pub(crate) sessions: SessionCache,
}

impl Researcher {
    pub fn new(credentials: Credentials, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            sessions: SessionCache::new(provider, credentials),
        }
    }

    /// Researcher backed by the real Spotify accounts service and Web API.
    pub fn spotify(credentials: Credentials, auth_base: &str, api_base: &str) -> Self {
        Self::new(
            credentials,
            Arc::new(SpotifyTokenProvider::new(auth_base, api_base)),
        )
    }
}
