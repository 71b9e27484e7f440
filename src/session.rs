//! Process-wide OAuth session cache.
//!
//! The cache owns the only state shared between requests: the current
//! [`AuthSession`]. The async mutex is held across the whole
//! check-refresh-adopt sequence, so callers racing past an expired session
//! queue behind the first one and pick up the session it adopted instead of
//! running their own token exchange.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::api::{AuthSession, CatalogClient, Credentials, TokenProvider};
use crate::context::RequestContext;
use crate::error::Error;

pub struct SessionCache {
    provider: Arc<dyn TokenProvider>,
    credentials: Credentials,
    session: Mutex<Option<AuthSession>>,
}

impl SessionCache {
    pub fn new(provider: Arc<dyn TokenProvider>, credentials: Credentials) -> Self {
        Self {
            provider,
            credentials,
            session: Mutex::new(None),
        }
    }

    /// Return a catalog handle whose token is valid right now, exchanging
    /// credentials for a new one when the cache is empty or expired.
    ///
    /// A failed exchange leaves the previous session in place.
    pub async fn get_session(&self, ctx: &RequestContext) -> Result<Arc<dyn CatalogClient>, Error> {
        let mut current = ctx.run("spotify.refresh", self.session.lock()).await?;

        if let Some(session) = current.as_ref() {
            if !session.is_expired_at(Instant::now()) {
                return Ok(session.client.clone());
            }
        }

        info!("refreshing spotify client...");
        let fresh = ctx
            .run(
                "spotify.refresh",
                self.provider.new_session(&self.credentials),
            )
            .await?
            .context("provider.NewClient")
            .map_err(|source| {
                warn!("spotify token exchange failed: {:#}", source);
                Error::Auth { source }
            })?;

        info!(
            "spotify client refreshed, token expires in {:?}",
            fresh.expires_at.saturating_duration_since(Instant::now())
        );
        let client = fresh.client.clone();
        *current = Some(fresh);
        Ok(client)
    }

    /// Expiry of the cached session, if one has been adopted.
    pub async fn expires_at(&self) -> Option<Instant> {
        self.session.lock().await.as_ref().map(|s| s.expires_at)
    }
}
