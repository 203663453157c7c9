//! Deflate compression for license artifacts.

use crate::errors::KeywrightError;
use crate::io::Transformation;
use flate2::write::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use std::io::Write;

/// Raw deflate transformation.
///
/// Applied before encryption in the write direction; undone after
/// decryption on read.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCompression {
    level: Compression,
}

impl DeflateCompression {
    /// Compression at the given level.
    pub fn new(level: Compression) -> Self {
        Self { level }
    }
}

impl Default for DeflateCompression {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl Transformation for DeflateCompression {
    fn apply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn unapply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
        let mut decoder = DeflateDecoder::new(Vec::new());
        decoder.write_all(data)?;
        Ok(decoder.finish()?)
    }
}
