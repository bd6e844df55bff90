//! Chunked file reading for replay uploads.
//!
//! Splits a recording into fixed-size, sequence-numbered chunks, computes
//! the per-chunk CRC32 sent alongside each upload, and generates the
//! human-readable file name a job's chunks share.

mod checksum;
mod chunked;
mod naming;
mod types;

pub use checksum::crc32;
pub use chunked::{ChunkReader, chunk_count};
pub use naming::{DEFAULT_EXTENSION, chunk_file_name, extension_of, generate_base_name};
pub use types::Chunk;

/// Default chunk size: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
