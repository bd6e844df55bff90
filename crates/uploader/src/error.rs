//! Upload error types.

use replaybot_transfer::TransferError;

/// Errors produced by the upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cannot read recording: {0}")]
    Transfer(#[from] TransferError),

    #[error("recording is empty: {0}")]
    EmptyFile(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response status {status}")]
    Protocol { status: u16 },

    #[error("unauthorized")]
    Unauthorized,

    #[error("job cancelled")]
    Cancelled,

    #[error("task join error: {0}")]
    Join(String),
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Errors from parsing the upload-info response.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed upload info: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upload info is not a JSON object")]
    NotAnObject,

    #[error("upload info has no upload_url")]
    MissingUploadUrl,
}

/// Why an endpoint resolution attempt fell back.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upload info returned status {0}")]
    Status(u16),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors from the upload scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler closed")]
    Closed,
}
