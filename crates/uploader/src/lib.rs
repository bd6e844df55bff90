//! Chunked replay upload pipeline.
//!
//! A saved recording is split into fixed-size chunks that are POSTed to an
//! upload endpoint negotiated at job start, with a bounded number of
//! uploads in flight. Each chunk is retried once; a `401` on the last chunk
//! clears the stored credential so the next recording re-links the account.

pub mod client;
pub mod config;
pub mod credential;
pub mod endpoint;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{AttemptResult, ChunkRequest, ChunkTransport, ChunkUploader, HttpTransport};
pub use config::UploaderConfig;
pub use credential::{CredentialInvalidator, LogNotifier, Notifier, ensure_credential};
pub use endpoint::{EndpointConfig, EndpointResolver, parse_upload_info};
pub use error::{ParseError, ResolveError, SchedulerError, UploadError};
pub use pipeline::{JobHandle, Uploader};
pub use retry::{ChunkOutcome, ChunkState, RetryPolicy};
pub use scheduler::{Admission, Drained, UploadScheduler};
pub use types::{JobReport, UploadJob};
