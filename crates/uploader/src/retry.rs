//! Single-retry policy and the per-chunk state machine.
//!
//! ```text
//! Pending -> Sent -> Acked
//!                 -> Rejected | Failed -> Retrying -> Acked
//!                                                  -> PermanentlyFailed
//! ```

use tracing::{error, warn};

use crate::client::{AttemptResult, ChunkRequest, ChunkUploader};
use crate::error::UploadError;

/// Lifecycle of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Sent,
    Acked,
    /// Answered with 401.
    Rejected,
    /// Transport error or unexpected status.
    Failed,
    Retrying,
    PermanentlyFailed,
}

impl ChunkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Acked | Self::PermanentlyFailed)
    }
}

/// Final result for one chunk.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub sequence: u64,
    pub state: ChunkState,
    pub attempts: u32,
    /// Every state the chunk passed through, `Pending` first.
    pub history: Vec<ChunkState>,
    pub last_error: Option<String>,
}

impl ChunkOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == ChunkState::Acked
    }
}

/// Retries a failed or rejected chunk a fixed number of times, immediately
/// and with identical parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_retry()
    }
}

impl RetryPolicy {
    /// One initial attempt plus exactly one retry.
    pub const fn single_retry() -> Self {
        Self { max_attempts: 2 }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Uploads `request`, retrying per policy, and reports the final state.
    pub async fn run(&self, uploader: &ChunkUploader, request: &ChunkRequest) -> ChunkOutcome {
        let mut history = vec![ChunkState::Pending];
        let mut last_error = None;
        let mut attempts = 0;

        loop {
            attempts += 1;
            history.push(if attempts == 1 {
                ChunkState::Sent
            } else {
                ChunkState::Retrying
            });

            let failed_state = match uploader.attempt(request).await {
                AttemptResult::Acked => {
                    history.push(ChunkState::Acked);
                    return ChunkOutcome {
                        sequence: request.sequence,
                        state: ChunkState::Acked,
                        attempts,
                        history,
                        last_error: None,
                    };
                }
                AttemptResult::Rejected => {
                    last_error = Some(UploadError::Unauthorized.to_string());
                    ChunkState::Rejected
                }
                AttemptResult::Failed(e) => {
                    last_error = Some(e.to_string());
                    ChunkState::Failed
                }
            };

            if attempts >= self.max_attempts {
                break;
            }
            // The first failure is recorded as Rejected/Failed; later ones
            // collapse into the terminal state below.
            if attempts == 1 {
                history.push(failed_state);
            }
            warn!(
                chunk = request.sequence,
                attempt = attempts,
                error = last_error.as_deref().unwrap_or_default(),
                "chunk upload failed, retrying"
            );
        }

        error!(
            chunk = request.sequence,
            attempts,
            error = last_error.as_deref().unwrap_or_default(),
            "chunk permanently failed"
        );
        history.push(ChunkState::PermanentlyFailed);
        ChunkOutcome {
            sequence: request.sequence,
            state: ChunkState::PermanentlyFailed,
            attempts,
            history,
            last_error,
        }
    }
}
