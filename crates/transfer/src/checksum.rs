use crc32fast::Hasher;

/// Computes the CRC32 (IEEE) of `data` with a fresh zero-seeded hasher.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
