use axum::http::StatusCode;
use music_researcher::api::dto::{FullArtist, FullTrack, SimpleAlbum, SimpleArtist, TrackPage};
use music_researcher::api::mock::{MockCatalog, MockTokenProvider};
use music_researcher::api::Credentials;
use music_researcher::server::{self, status_for, AppState, TIMEOUT_HEADER};
use music_researcher::service::{ErrorReporter, MusicResearcherService};
use music_researcher::{Error, ErrorKind, Researcher};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingReporter {
    reports: Mutex<Vec<(ErrorKind, String)>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, err: &Error, message: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((err.kind(), message.to_string()));
    }
}

struct Harness {
    base: String,
    reporter: Arc<RecordingReporter>,
    stop: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    async fn start(catalog: MockCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let provider = Arc::new(MockTokenProvider::new(catalog, Duration::from_secs(60)));
        let researcher = Arc::new(Researcher::new(
            Credentials::new("client-id", "client-secret"),
            provider,
        ));
        let reporter = Arc::new(RecordingReporter::default());
        let state = AppState {
            service: Arc::new(MusicResearcherService::new(researcher, reporter.clone())),
            service_name: "music-researcher-test".into(),
            request_timeout: Duration::from_secs(5),
            shutdown: CancellationToken::new(),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::run(
            listener,
            state,
            Duration::from_millis(100),
            async move {
                let _ = rx.await;
            },
        ));

        Harness {
            base,
            reporter,
            stop: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

fn catalog() -> MockCatalog {
    let track = FullTrack {
        id: "t1".into(),
        name: "Crying".into(),
        duration_ms: 181_000,
        popularity: 42,
        album: SimpleAlbum {
            id: "album-1".into(),
            release_date: "2004-01-01".into(),
            ..Default::default()
        },
        artists: vec![SimpleArtist {
            id: "a1".into(),
            ..Default::default()
        }],
        ..Default::default()
    };
    MockCatalog::new()
        .with_pages(vec![TrackPage {
            items: vec![track],
            ..Default::default()
        }])
        .with_artist(FullArtist {
            id: "a1".into(),
            name: "Chilly Gonzales".into(),
            external_urls: HashMap::from([("spotify".into(), "artist-url".into())]),
            genres: vec!["piano".into()],
            images: vec![],
        })
        .with_genres(vec!["piano".into(), "jazz".into()])
}

#[tokio::test]
async fn health_reports_service_name() {
    let h = Harness::start(catalog()).await;

    let body: Value = reqwest::get(h.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "music-researcher-test");

    h.stop().await;
}

#[tokio::test]
async fn search_returns_camel_case_results() {
    let h = Harness::start(catalog()).await;

    let resp = reqwest::Client::new()
        .post(h.url("/v1/search"))
        .header(TIMEOUT_HEADER, "2000")
        .json(&json!({ "query": "chilly gonzales", "genreFilters": ["piano"], "limit": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["albums"], json!([]));
    assert_eq!(body["artists"], json!([]));
    let track = &body["tracks"][0];
    assert_eq!(track["id"], "t1");
    assert_eq!(track["durationMs"], 181_000);
    assert_eq!(track["previewUrl"], "");
    assert_eq!(track["album"]["releaseDate"], "2004-01-01");
    assert_eq!(track["artists"][0]["spotifyUrl"], "artist-url");
    assert_eq!(track["artists"][0]["genres"], json!(["piano"]));

    h.stop().await;
}

#[tokio::test]
async fn empty_query_is_a_bad_request() {
    let h = Harness::start(catalog()).await;

    let resp = reqwest::Client::new()
        .post(h.url("/v1/search"))
        .json(&json!({ "query": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["error"], "validation: empty query");

    let reports = h.reporter.reports.lock().unwrap().clone();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, ErrorKind::Validation);
    assert!(reports[0].1.starts_with("failed to search spotify with params"));

    h.stop().await;
}

#[tokio::test]
async fn genres_are_listed() {
    let h = Harness::start(catalog()).await;

    let body: Value = reqwest::get(h.url("/v1/genres"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["genres"], json!(["piano", "jazz"]));

    h.stop().await;
}

#[tokio::test]
async fn provider_failure_is_a_bad_gateway() {
    let h = Harness::start(MockCatalog::new().with_genre_error("upstream down")).await;

    let resp = reqwest::get(h.url("/v1/genres")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "provider");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("client.GetAvailableGenreSeeds"));

    let reports = h.reporter.reports.lock().unwrap().clone();
    assert_eq!(
        reports,
        vec![(
            ErrorKind::Provider,
            "failed to get genre list from spotify".to_string()
        )]
    );

    h.stop().await;
}

#[tokio::test]
async fn short_timeout_header_gives_gateway_timeout() {
    let h = Harness::start(catalog().with_delay(Duration::from_millis(500))).await;

    let resp = reqwest::Client::new()
        .get(h.url("/v1/genres"))
        .header(TIMEOUT_HEADER, "50")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 504);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "deadline_exceeded");

    h.stop().await;
}

#[test]
fn error_kinds_map_to_statuses() {
    assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(ErrorKind::Auth), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for(ErrorKind::Provider), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for(ErrorKind::DeadlineExceeded), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(status_for(ErrorKind::Cancelled).as_u16(), 499);
}
