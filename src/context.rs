//! Per-request cancellation and deadline.
//!
//! Every provider call made on behalf of a request goes through
//! [`RequestContext::run`], which races the call against the caller's
//! cancellation token and deadline. Losing the race drops the in-flight
//! future, so the underlying HTTP request is aborted rather than left running.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Interruption};

#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Tighten the deadline to `timeout` from now. An earlier deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drive `fut` unless the request is cancelled or its deadline passes first.
    ///
    /// `context` names the step for the resulting error. Cancellation is
    /// checked before the future is polled, so an already-cancelled request
    /// never reaches the provider.
    pub async fn run<F>(&self, context: &'static str, fut: F) -> Result<F::Output, Error>
    where
        F: Future,
    {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled {
                context,
                cause: Interruption::Cancelled,
            }),
            _ = deadline => Err(Error::Cancelled {
                context,
                cause: Interruption::DeadlineExceeded,
            }),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn background_context_lets_futures_finish() {
        let ctx = RequestContext::background();
        let out = ctx.run("step", async { 42 }).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn cancelled_context_never_polls_the_future() {
        let ctx = RequestContext::background();
        ctx.cancel();
        let res: Result<(), Error> = ctx
            .run("client.Search", async { unreachable!("must not be polled") })
            .await;
        let err = res.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_future() {
        let ctx = RequestContext::background().with_timeout(Duration::from_secs(1));
        let err = ctx
            .run("client.GetArtist", tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        assert!(err.to_string().starts_with("client.GetArtist"));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_deadline_wins() {
        let ctx = RequestContext::background()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(10));
        let expected = Instant::now() + Duration::from_secs(1);
        assert_eq!(ctx.deadline(), Some(expected));
    }
}
