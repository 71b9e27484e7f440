use crate::api::spotify::api_base_from_env;
use crate::api::spotify_auth::auth_base_from_env;
use crate::api::Credentials;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    // Request handling
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    #[serde(default)]
    pub spotify: SpotifyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "auth_base_from_env")]
    pub auth_base: String,
    #[serde(default = "api_base_from_env")]
    pub api_base: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_base: auth_base_from_env(),
            api_base: api_base_from_env(),
        }
    }
}

fn default_listen_addr() -> String { "0.0.0.0:8080".into() }
fn default_service_name() -> String { "music-researcher".into() }
fn default_log_dir() -> PathBuf { "/var/log/music-researcher".into() }
fn default_request_timeout() -> u64 { 10 }
fn default_shutdown_grace() -> u64 { 5 }

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            service_name: default_service_name(),
            log_dir: default_log_dir(),
            request_timeout_secs: default_request_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
            spotify: SpotifyConfig::default(),
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Read `path` when given, otherwise start from defaults; then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_path(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in
    /// production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = non_empty("PORT") {
            self.listen_addr = format!("0.0.0.0:{}", port.trim());
        }
        if let Some(name) = non_empty("K_SERVICE") {
            self.service_name = name;
        }
        if let Some(id) = non_empty("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = id;
        }
        if let Some(secret) = non_empty("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = secret;
        }
        if let Some(base) = non_empty("SPOTIFY_AUTH_BASE") {
            self.spotify.auth_base = base;
        }
        if let Some(base) = non_empty("SPOTIFY_API_BASE") {
            self.spotify.api_base = base;
        }
    }

    /// Spotify credentials; missing values are a startup error.
    pub fn credentials(&self) -> Result<Credentials> {
        if self.spotify.client_id.trim().is_empty() {
            return Err(anyhow!("spotify client ID not provided"));
        }
        if self.spotify.client_secret.trim().is_empty() {
            return Err(anyhow!("spotify client secret not provided"));
        }
        Ok(Credentials::new(
            self.spotify.client_id.clone(),
            self.spotify.client_secret.clone(),
        ))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
