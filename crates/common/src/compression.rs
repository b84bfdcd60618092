//! Brotli compression for batch and rollup payloads.
//!
//! Rollup payloads pay L1 data-availability prices, so we default to the
//! maximum quality setting and eat the CPU.

use std::io::Cursor;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("compression failed: {0}")]
    Failed(String),

    #[error("corrupted compressed payload")]
    Corrupted,
}

/// Compression parameters, fixed for the lifetime of the network so every
/// enclave produces identical blobs.
#[derive(Copy, Clone, Debug)]
pub struct CompressionService {
    quality: i32,
    lgwin: i32,
}

impl CompressionService {
    /// Quality 11 with a 4MB window.
    pub fn max_compression() -> Self {
        Self {
            quality: 11,
            lgwin: 22,
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let params = brotli::enc::BrotliEncoderParams {
            quality: self.quality,
            lgwin: self.lgwin,
            ..Default::default()
        };
        let mut output = Vec::new();
        brotli::BrotliCompress(&mut Cursor::new(data), &mut output, &params)
            .map_err(|e| CompressionError::Failed(e.to_string()))?;
        Ok(output)
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut output = Vec::new();
        brotli::BrotliDecompress(&mut Cursor::new(data), &mut output)
            .map_err(|_| CompressionError::Corrupted)?;
        Ok(output)
    }
}

impl Default for CompressionService {
    fn default() -> Self {
        Self::max_compression()
    }
}
