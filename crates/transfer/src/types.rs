use bytes::Bytes;

use crate::checksum::crc32;

/// A contiguous slice of the source file, uploaded as one request.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based position of this chunk within the file.
    pub sequence: u64,
    /// Total number of chunks the file splits into.
    pub total: u64,
    /// Raw chunk bytes.
    pub data: Bytes,
}

impl Chunk {
    /// CRC32 of the payload. Always recomputed from `data`.
    pub fn checksum(&self) -> u32 {
        crc32(&self.data)
    }

    /// True for the final chunk of the file.
    pub fn is_last(&self) -> bool {
        self.sequence == self.total
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
