//! JSON-over-HTTP transport for the service, with graceful shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::RequestContext;
use crate::error::{Error, ErrorKind};
use crate::models::{GenreList, Parameters, Results};
use crate::service::MusicResearcherService;

/// Header a caller may set to shorten its deadline below the server default.
pub const TIMEOUT_HEADER: &str = "x-request-timeout-ms";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MusicResearcherService>,
    pub service_name: String,
    pub request_timeout: Duration,
    /// Cancelled once the drain period after a shutdown signal has elapsed.
    pub shutdown: CancellationToken,
}

impl AppState {
    fn request_context(&self, headers: &HeaderMap) -> RequestContext {
        let ctx = RequestContext::new(self.shutdown.child_token()).with_timeout(self.request_timeout);
        match headers
            .get(TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
            None => ctx,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/search", post(search))
        .route("/v1/genres", get(genres))
        .with_state(state)
}

/// Error response body: `{"error": "...", "kind": "..."}`.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Auth | ErrorKind::Provider => StatusCode::BAD_GATEWAY,
        ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        // Client closed request; nginx's convention, there is no standard code.
        ErrorKind::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = Json(json!({
            "error": self.0.to_string(),
            "kind": kind.as_str(),
        }));
        (status_for(kind), body).into_response()
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": state.service_name,
    }))
}

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<Parameters>,
) -> Result<Json<Results>, ApiError> {
    let ctx = state.request_context(&headers);
    let results = state.service.search(&ctx, &params).await?;
    Ok(Json(results))
}

async fn genres(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GenreList>, ApiError> {
    let ctx = state.request_context(&headers);
    let list = state.service.get_genre_list(&ctx).await?;
    Ok(Json(list))
}

/// Serve until `signal` resolves, then stop accepting, let in-flight requests
/// drain for `grace`, and cancel whatever is still running after that.
pub async fn run<S>(listener: TcpListener, state: AppState, grace: Duration, signal: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("reading listener address")?;
    info!("listening on {}", addr);

    let shutdown = state.shutdown.clone();
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            info!("shutdown requested, draining in-flight requests for {:?}", grace);
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                shutdown.cancel();
            });
        })
        .await
        .context("serving http")?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
