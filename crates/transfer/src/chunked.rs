use std::io::Read;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Number of chunks a file of `file_size` bytes splits into.
pub fn chunk_count(file_size: u64, chunk_size: usize) -> u64 {
    let chunk_size = chunk_size as u64;
    if file_size == 0 || chunk_size == 0 {
        return 0;
    }
    file_size.div_ceil(chunk_size)
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a file front to back in fixed-size, sequence-numbered chunks.
///
/// The sequence is finite and cannot be restarted: each call to
/// [`next_chunk`](Self::next_chunk) continues where the previous one ended.
pub struct ChunkReader {
    file: std::fs::File,
    path: PathBuf,
    chunk_size: usize,
    file_size: u64,
    total: u64,
    next_sequence: u64,
    offset: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (5 MiB) is used.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            path: path.to_path_buf(),
            chunk_size,
            file_size,
            total: chunk_count(file_size, chunk_size),
            next_sequence: 1,
            offset: 0,
        })
    }

    /// Reads the next chunk. Returns `None` once the file is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        if self.next_sequence > self.total {
            return Ok(None);
        }

        let remaining = self.file_size - self.offset;
        let read_size = remaining.min(self.chunk_size as u64);
        let mut buf = Vec::with_capacity(read_size as usize);
        let n = (&mut self.file).take(read_size).read_to_end(&mut buf)?;
        if n == 0 {
            // File shrank underneath us.
            self.next_sequence = self.total + 1;
            return Ok(None);
        }

        let chunk = Chunk {
            sequence: self.next_sequence,
            total: self.total,
            data: Bytes::from(buf),
        };
        self.next_sequence += 1;
        self.offset += n as u64;
        Ok(Some(chunk))
    }

    /// Total number of chunks this file splits into.
    pub fn total_chunks(&self) -> u64 {
        self.total
    }

    /// File size in bytes at open time.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    fn read_all(reader: &mut ChunkReader) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn chunk_count_formula() {
        assert_eq!(chunk_count(0, 4), 0);
        assert_eq!(chunk_count(1, 4), 1);
        assert_eq!(chunk_count(4, 4), 1);
        assert_eq!(chunk_count(5, 4), 2);
        assert_eq!(chunk_count(12 * 1024 * 1024, DEFAULT_CHUNK_SIZE), 3);
        assert_eq!(chunk_count(10, 0), 0);
    }

    #[test]
    fn chunk_reader_reads_all() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"AABBCCDDEE");

        let mut reader = ChunkReader::open(&path, 4).unwrap();
        assert_eq!(reader.file_size(), 10);
        assert_eq!(reader.total_chunks(), 3);

        let chunks = read_all(&mut reader);
        assert_eq!(chunks.len(), 3);
        assert_eq!(&chunks[0].data[..], b"AABB");
        assert_eq!(&chunks[1].data[..], b"CCDD");
        assert_eq!(&chunks[2].data[..], b"EE");

        let sequences: Vec<u64> = chunks.iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert!(chunks.iter().all(|c| c.total == 3));
        assert!(!chunks[0].is_last());
        assert!(chunks[2].is_last());

        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn exact_multiple_has_full_last_chunk() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "even.bin", &[7u8; 12]);

        let mut reader = ChunkReader::open(&path, 4).unwrap();
        let chunks = read_all(&mut reader);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 4));
        assert!(chunks[2].is_last());
    }

    #[test]
    fn twelve_mib_with_default_chunk_size() {
        let dir = TempDir::new().unwrap();
        let data = vec![0xA5u8; 12 * 1024 * 1024];
        let path = create_test_file(dir.path(), "replay.mp4", &data);

        let mut reader = ChunkReader::open(&path, 0).unwrap();
        assert_eq!(reader.chunk_size(), DEFAULT_CHUNK_SIZE);

        let chunks = read_all(&mut reader);
        let sizes: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(
            sizes,
            vec![5 * 1024 * 1024, 5 * 1024 * 1024, 2 * 1024 * 1024]
        );
        assert!(chunks.iter().all(|c| c.total == 3));
    }

    #[test]
    fn empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "empty.bin", b"");

        let mut reader = ChunkReader::open(&path, 4).unwrap();
        assert_eq!(reader.total_chunks(), 0);
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = ChunkReader::open(&dir.path().join("missing.mp4"), 4);
        assert!(matches!(result, Err(TransferError::Io(_))));
    }

    #[test]
    fn checksums_match_delivered_bytes() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let path = create_test_file(dir.path(), "data.bin", &data);

        let mut reader = ChunkReader::open(&path, 300).unwrap();
        let mut reassembled = Vec::new();
        for chunk in read_all(&mut reader) {
            assert_eq!(chunk.checksum(), crate::crc32(&chunk.data));
            reassembled.extend_from_slice(&chunk.data);
        }
        assert_eq!(reassembled, data);
    }

    #[test]
    fn shrunken_file_ends_early() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "shrink.bin", &[1u8; 10]);

        let mut reader = ChunkReader::open(&path, 4).unwrap();
        let first = reader.next_chunk().unwrap().unwrap();
        assert_eq!(first.len(), 4);

        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(4)
            .unwrap();

        assert!(reader.next_chunk().unwrap().is_none());
        assert!(reader.next_chunk().unwrap().is_none());
    }
}
