use std::fmt;

/// Why a request stopped before its provider call completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::Cancelled => f.write_str("request cancelled"),
            Interruption::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Errors surfaced by the catalog integration.
///
/// Every variant carries a short static tag naming the step that failed, so
/// the rendered message reads like `client.GetArtist: 404 Not Found => ...`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller input rejected before any network call.
    #[error("validation: {0}")]
    Validation(String),

    /// Token exchange failed. The previous session, if any, is kept.
    #[error("spotify.refresh: {source:#}")]
    Auth {
        #[source]
        source: anyhow::Error,
    },

    /// A catalog call failed.
    #[error("{context}: {source:#}")]
    Provider {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The caller gave up (cancellation or deadline) while `context` was running.
    #[error("{context}: {cause}")]
    Cancelled {
        context: &'static str,
        cause: Interruption,
    },
}

/// Coarse classification used by the transport and the error sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Provider,
    Cancelled,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::Provider => "provider",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl Error {
    pub(crate) fn provider(context: &'static str, source: anyhow::Error) -> Self {
        Error::Provider { context, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Auth { .. } => ErrorKind::Auth,
            Error::Provider { .. } => ErrorKind::Provider,
            Error::Cancelled {
                cause: Interruption::Cancelled,
                ..
            } => ErrorKind::Cancelled,
            Error::Cancelled {
                cause: Interruption::DeadlineExceeded,
                ..
            } => ErrorKind::DeadlineExceeded,
        }
    }

    /// True when the caller stopped waiting, as opposed to the provider failing.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
