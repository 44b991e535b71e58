use thiserror::Error;

/// Errors surfaced by reporting and export.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("a profiler is already active: {0}")]
    ProfilerActive(&'static str),
    #[error("reporter `{reporter}` failed: {message}")]
    Reporter {
        reporter: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
