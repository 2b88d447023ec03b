//! CRC-32 (AUTODIN-II / zlib polynomial, reflected) with incremental
//! accumulation, matching `crc32fast`'s default algorithm (the same one
//! `zlib::crc32` and gzip use).
use crc32fast::Hasher;

/// A running CRC-32 accumulator.
///
/// Supports `crc(a || b, seed) = crc(b, crc(a, seed))`: bytes can be fed in
/// as many chunks as convenient (header fields, then metadata, then data)
/// without ever materializing the record contiguously.
pub struct IncrementalCrc {
    hasher: Hasher,
}

impl IncrementalCrc {
    /// Starts a fresh accumulator with the standard initial value.
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
        }
    }

    /// Resumes an accumulator from a previously-finalized checksum, so that
    /// `crc(b, crc(a, seed))` can be computed across independent calls.
    pub fn resume(seed: u32) -> Self {
        Self {
            hasher: Hasher::new_with_initial(seed),
        }
    }

    /// Folds `bytes` into the running checksum.
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Consumes the accumulator, returning the final CRC-32 value.
    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

impl Default for IncrementalCrc {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the CRC-32 of a single byte slice in one call.
pub fn crc32_of(bytes: &[u8]) -> u32 {
    let mut c = IncrementalCrc::new();
    c.update(bytes);
    c.finalize()
}
