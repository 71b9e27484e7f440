use super::dto::TokenResponse;
use super::spotify::SpotifyClient;
use super::{AuthSession, Credentials, TokenProvider};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_AUTH_BASE: &str = "https://accounts.spotify.com";

/// Tokens are treated as expired this long before the provider says they are.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Spotify accounts base URL. `SPOTIFY_AUTH_BASE` overrides it (useful for tests).
pub fn auth_base_from_env() -> String {
    env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| DEFAULT_AUTH_BASE.into())
}

/// Client-credentials flow against the Spotify accounts service.
///
/// Each successful exchange yields a fresh [`SpotifyClient`] carrying the new
/// bearer token. No refresh token exists in this flow; the session cache simply
/// asks for a new session when the old one expires.
pub struct SpotifyTokenProvider {
    client: Client,
    auth_base: String,
    api_base: String,
}

impl SpotifyTokenProvider {
    pub fn new(auth_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self::with_client(Client::new(), auth_base, api_base)
    }

    pub fn with_client(
        client: Client,
        auth_base: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_base: auth_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into(),
        }
    }

    async fn request_token(&self, credentials: &Credentials) -> Result<TokenResponse> {
        let params = [("grant_type", "client_credentials")];
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!(
                "{}:{}",
                credentials.client_id, credentials.client_secret
            ))
        );
        let url = format!("{}/api/token", self.auth_base);
        debug!("requesting client-credentials token from {}", url);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth_header)
            .form(&params)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("token exchange failed: {} - {}", status, body));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| anyhow!("parse token json: {}", e))?;
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for SpotifyTokenProvider {
    async fn new_session(&self, credentials: &Credentials) -> Result<AuthSession> {
        let issued_at = Instant::now();
        let token = self.request_token(credentials).await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_SKEW);
        let client = SpotifyClient::new(
            self.client.clone(),
            self.api_base.clone(),
            &token.token_type,
            &token.access_token,
        );
        Ok(AuthSession::new(Arc::new(client), issued_at + lifetime))
    }
}
