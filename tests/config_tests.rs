use music_researcher::config::Config;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_without_file() {
    let cfg = Config::default();
    assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
    assert_eq!(cfg.service_name, "music-researcher");
    assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.shutdown_grace(), Duration::from_secs(5));
    assert!(cfg.spotify.client_id.is_empty());
}

#[test]
fn reads_toml_file() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.toml");
    fs::write(
        &path,
        r#"
listen_addr = "127.0.0.1:9000"
log_dir = "/tmp/mr-logs"
request_timeout_secs = 3

[spotify]
client_id = "file-id"
client_secret = "file-secret"
api_base = "http://localhost:1234/v1"
"#,
    )
    .unwrap();

    let cfg = Config::from_path(&path).unwrap();
    assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.log_dir.to_str(), Some("/tmp/mr-logs"));
    assert_eq!(cfg.request_timeout(), Duration::from_secs(3));
    // unset keys keep their defaults
    assert_eq!(cfg.shutdown_grace_secs, 5);
    assert_eq!(cfg.service_name, "music-researcher");
    assert_eq!(cfg.spotify.api_base, "http://localhost:1234/v1");

    let creds = cfg.credentials().unwrap();
    assert_eq!(creds.client_id, "file-id");
    assert_eq!(creds.client_secret, "file-secret");
}

#[test]
fn malformed_file_is_an_error() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.toml");
    fs::write(&path, "listen_addr = [").unwrap();
    assert!(Config::from_path(&path).is_err());
    assert!(Config::from_path(&td.path().join("missing.toml")).is_err());
}

#[test]
fn environment_overrides_file_values() {
    let mut cfg = Config::default();
    cfg.spotify.client_id = "file-id".into();

    cfg.apply_env(lookup(&[
        ("PORT", "7070"),
        ("K_SERVICE", "music-researcher-staging"),
        ("SPOTIFY_CLIENT_ID", "env-id"),
        ("SPOTIFY_CLIENT_SECRET", "env-secret"),
        ("SPOTIFY_AUTH_BASE", "http://auth.local"),
        ("SPOTIFY_API_BASE", "http://api.local/v1"),
    ]));

    assert_eq!(cfg.listen_addr, "0.0.0.0:7070");
    assert_eq!(cfg.service_name, "music-researcher-staging");
    assert_eq!(cfg.spotify.client_id, "env-id");
    assert_eq!(cfg.spotify.client_secret, "env-secret");
    assert_eq!(cfg.spotify.auth_base, "http://auth.local");
    assert_eq!(cfg.spotify.api_base, "http://api.local/v1");
}

#[test]
fn empty_environment_values_are_ignored() {
    let mut cfg = Config::default();
    cfg.spotify.client_id = "file-id".into();

    cfg.apply_env(lookup(&[("SPOTIFY_CLIENT_ID", ""), ("PORT", "  ")]));

    assert_eq!(cfg.spotify.client_id, "file-id");
    assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
}

#[test]
fn missing_credentials_are_reported() {
    let mut cfg = Config::default();
    cfg.apply_env(lookup(&[]));
    let err = cfg.credentials().unwrap_err();
    assert_eq!(err.to_string(), "spotify client ID not provided");

    cfg.apply_env(lookup(&[("SPOTIFY_CLIENT_ID", "id")]));
    let err = cfg.credentials().unwrap_err();
    assert_eq!(err.to_string(), "spotify client secret not provided");
}

#[test]
fn credentials_debug_hides_secret() {
    let mut cfg = Config::default();
    cfg.apply_env(lookup(&[
        ("SPOTIFY_CLIENT_ID", "id"),
        ("SPOTIFY_CLIENT_SECRET", "super-secret"),
    ]));
    let shown = format!("{:?}", cfg.credentials().unwrap());
    assert!(shown.contains("id"));
    assert!(!shown.contains("super-secret"));
}
