//! Error types for the ranking pipeline.

use reqwest::StatusCode;

/// Errors produced while fetching a ranking or exporting a watchlist.
///
/// Each variant is fatal to the call that produced it only; the CLI batch
/// loop logs and moves on to the next ranking type. Nothing is retried.
#[derive(thiserror::Error, Debug)]
pub enum RankingError {
    /// The requested ranking key is not in the source registry.
    #[error("unknown ranking type: {0}")]
    UnknownRankingType(String),
    /// A network or timeout error from the HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The site answered with a non-success status.
    #[error("unexpected status {status}")]
    HttpStatus { status: StatusCode },
    /// The scripted browser session failed to launch or navigate.
    #[error("browser session error: {0}")]
    Browser(String),
    /// A file-system error while writing the watchlist.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
