//! Upload job and report types.

use std::path::PathBuf;

use uuid::Uuid;

use replaybot_transfer::{Chunk, chunk_file_name};

use crate::client::ChunkRequest;
use crate::retry::ChunkOutcome;

/// One recording being uploaded.
///
/// Everything here is fixed when the job starts; chunks dispatched later
/// keep using the credential and URL captured at that point.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub id: Uuid,
    pub source: PathBuf,
    pub credential: String,
    pub upload_url: String,
    /// Generated name shared by every chunk (`a-b-dd-mm-YYYY-HH-MM.ext`).
    pub base_name: String,
    pub total_chunks: u64,
    pub dev: bool,
}

impl UploadJob {
    /// Builds the request that uploads `chunk`.
    pub fn request_for(&self, chunk: &Chunk) -> ChunkRequest {
        ChunkRequest {
            url: self.upload_url.clone(),
            credential: self.credential.clone(),
            file_name: chunk_file_name(&self.base_name, chunk.sequence),
            sequence: chunk.sequence,
            total_chunks: self.total_chunks,
            checksum: chunk.checksum(),
            dev: self.dev,
            body: chunk.data.clone(),
        }
    }
}

/// Summary of a finished (or stopped) job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: Uuid,
    pub file_name: String,
    pub upload_url: String,
    pub total_chunks: u64,
    /// Chunks handed to the scheduler.
    pub dispatched: u64,
    pub acked: u64,
    /// Sequences that ended `PermanentlyFailed`, ascending.
    pub failed: Vec<u64>,
    /// Dispatched chunks that produced no outcome (cancelled or panicked).
    pub unfinished: u64,
    /// Set when reading the file failed part way through.
    pub read_error: Option<String>,
    /// Per-chunk outcomes ordered by sequence.
    pub outcomes: Vec<ChunkOutcome>,
}

impl JobReport {
    /// True when every chunk of the file was acknowledged.
    pub fn is_complete(&self) -> bool {
        self.read_error.is_none() && self.acked == self.total_chunks
    }

    pub fn outcome(&self, sequence: u64) -> Option<&ChunkOutcome> {
        self.outcomes.iter().find(|o| o.sequence == sequence)
    }
}
