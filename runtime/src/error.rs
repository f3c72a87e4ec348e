//! Typed errors for the cases callers need to match on.
//!
//! Most internals return `anyhow::Result` and attach context; these variants
//! are the ones that change control flow (a timeout becomes an outcome, a
//! browser that never started aborts the batch).

/// Errors surfaced by the validation engine and its collaborators.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Network, DNS, or TLS failure while fetching or navigating.
    #[error("transport error: {0}")]
    Transport(String),

    /// DOM-ready wait exceeded the navigation timeout.
    #[error("render timed out after {timeout_ms}ms for {url}")]
    RenderTimeout { url: String, timeout_ms: u64 },

    /// `render_snapshot` was called without a preceding successful navigation.
    #[error("no active navigation to snapshot")]
    NoActiveNavigation,

    /// The browser could not be started or refused a new context.
    #[error("browser unavailable: {0}")]
    ResourceExhaustion(String),

    /// Invalid configuration or rule table.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Whether this error should stop the whole batch rather than a single link.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::ResourceExhaustion(_) | Self::Config(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
