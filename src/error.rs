//! Error type shared by the collector pipeline.
//!
//! Every failure is one [`CollectorError`]. Callers that need to decide how to
//! report a failure (reject the request, surface a conflict, retry later) ask
//! for its [`ErrorKind`] instead of matching on individual variants.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Coarse classification of a [`CollectorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input. Nothing was touched.
    Validation,
    /// The request clashes with existing state. Nothing was touched.
    Conflict,
    /// The submission pipeline ran to the end but some hosting step came back
    /// empty. Side effects that did happen are not rolled back.
    Partial,
    /// Anything else: network, parsing, IO, storage.
    Fatal,
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("{0} is NOT a legal date.")]
    InvalidDate(String),

    #[error("{start} is later than {end}.")]
    DateRange { start: String, end: String },

    #[error("unknown difficulty `{0}` (expected easy, medium or hard)")]
    InvalidDifficulty(String),

    #[error("Article Exists: {0}")]
    AlreadyCollected(String),

    #[error("open submissions must be merged or closed first:\n{}", .0.join("\n"))]
    OpenSubmissions(Vec<String>),

    #[error(
        "submission of `{branch}` is incomplete (branch: {}, file: {}, pull request: {})",
        .branch_url.as_deref().unwrap_or("missing"),
        .file_url.as_deref().unwrap_or("missing"),
        .pr_url.as_deref().unwrap_or("missing")
    )]
    PartialSubmission {
        branch: String,
        branch_url: Option<String>,
        file_url: Option<String>,
        pr_url: Option<String>,
    },

    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no extraction rule configured for host `{0}`")]
    MissingRule(String),

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("malformed counter record `{0}`")]
    Counter(String),

    #[error("malformed feed: {0}")]
    Feed(String),

    #[error("hosting service refused to {action}: {status} {body}")]
    Hosting {
        action: &'static str,
        status: u16,
        body: String,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl CollectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectorError::InvalidDate(_)
            | CollectorError::DateRange { .. }
            | CollectorError::InvalidDifficulty(_) => ErrorKind::Validation,
            CollectorError::AlreadyCollected(_) | CollectorError::OpenSubmissions(_) => {
                ErrorKind::Conflict
            }
            CollectorError::PartialSubmission { .. } => ErrorKind::Partial,
            _ => ErrorKind::Fatal,
        }
    }

    pub(crate) fn invalid_url(url: &str, source: url::ParseError) -> Self {
        CollectorError::InvalidUrl {
            url: url.to_string(),
            source,
        }
    }
}
