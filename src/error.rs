//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`crate::session::Session`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The interaction could not be performed this time (stale control,
    /// failed request, bad status). Ends collection for the current target only.
    #[error("transient session failure: {0}")]
    Transient(String),

    /// The session itself is gone; nothing more can be done with it.
    #[error("session closed: {0}")]
    Closed(String),
}

impl SessionError {
    /// Whether the whole multi-target run has to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transient(e.to_string())
    }
}

/// Errors raised while building a site adapter or resolving a target locator.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid selector `{css}`: {reason}")]
    Selector { css: String, reason: String },

    #[error("invalid locator `{locator}`: {reason}")]
    InvalidLocator { locator: String, reason: String },
}

impl ScrapeError {
    pub fn invalid_locator(locator: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors from the tabular sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create output directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to write run summary to {path}: {reason}")]
    Summary { path: PathBuf, reason: String },
}
