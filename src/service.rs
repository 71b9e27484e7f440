//! RPC-facing service: forwards calls to the [`Researcher`] and reports
//! failures to an error sink before handing them back to the transport.

use std::sync::Arc;

use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{Error, ErrorKind};
use crate::models::{GenreList, Parameters, Results};
use crate::researcher::Researcher;

/// Receives failed operations for observability. Implementations must not block.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, err: &Error, message: &str);
}

/// Default sink: structured log events.
#[derive(Debug, Default, Clone)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, err: &Error, message: &str) {
        match err.kind() {
            ErrorKind::Validation | ErrorKind::Cancelled => {
                warn!(kind = err.kind().as_str(), "{}: {}", message, err)
            }
            _ => error!(kind = err.kind().as_str(), "{}: {}", message, err),
        }
    }
}

pub struct MusicResearcherService {
    researcher: Arc<Researcher>,
    reporter: Arc<dyn ErrorReporter>,
}

impl MusicResearcherService {
    pub fn new(researcher: Arc<Researcher>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            researcher,
            reporter,
        }
    }

    pub fn with_log_reporter(researcher: Arc<Researcher>) -> Self {
        Self::new(researcher, Arc::new(LogReporter))
    }

    pub async fn search(&self, ctx: &RequestContext, params: &Parameters) -> Result<Results, Error> {
        let span = info_span!("rpc", method = "Search", request_id = %Uuid::new_v4());
        async {
            let tracks = self
                .researcher
                .search(ctx, &params.query, &params.genre_filters, params.limit)
                .await
                .map_err(|err| {
                    self.reporter.report(
                        &err,
                        &format!("failed to search spotify with params: {:?}", params),
                    );
                    err
                })?;

            Ok(Results {
                albums: Vec::new(),
                artists: Vec::new(),
                tracks,
            })
        }
        .instrument(span)
        .await
    }

    pub async fn get_genre_list(&self, ctx: &RequestContext) -> Result<GenreList, Error> {
        let span = info_span!("rpc", method = "GetGenreList", request_id = %Uuid::new_v4());
        async {
            self.researcher.genre_list(ctx).await.map_err(|err| {
                self.reporter
                    .report(&err, "failed to get genre list from spotify");
                err
            })
        }
        .instrument(span)
        .await
    }
}
