use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{CnnError, CnnResult};

/// Sequential reader over a flat INT8 weight blob.
///
/// The blob carries no lengths or checksums: the order and sizes of the `load_*`
/// calls must match the order the blob was serialized in. Every consuming call
/// checks the remaining length first and fails with
/// [`CnnError::InsufficientWeightData`] without moving the cursor.
pub struct WeightStream<'a> {
    blob: &'a [i8],
    offset: usize,
}

impl<'a> WeightStream<'a> {
    pub fn new(blob: &'a [i8]) -> Self {
        WeightStream { blob, offset: 0 }
    }

    /// Values consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.blob.len() - self.offset
    }

    /// Zero-copy view of the next `n` values.
    pub fn map(&mut self, n: usize) -> CnnResult<&'a [i8]> {
        if n > self.remaining() {
            return Err(CnnError::InsufficientWeightData {
                requested: n,
                offset: self.offset,
                available: self.blob.len(),
            });
        }
        let blob: &'a [i8] = self.blob;
        let slice = &blob[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Convolution weights in `[out][in][kh][kw]` order.
    pub fn load_conv(&mut self, out_ch: usize, in_ch: usize, k: usize) -> CnnResult<Vec<i8>> {
        let offset = self.offset;
        let weights = self.map(out_ch * in_ch * k * k)?.to_vec();
        tracing::debug!(
            "loaded conv weights {}x{}x{}x{} = {} (offset {})",
            out_ch, in_ch, k, k, weights.len(), offset
        );
        Ok(weights)
    }

    /// Dense weights in `[out][in]` order.
    pub fn load_fc(&mut self, out_features: usize, in_features: usize) -> CnnResult<Vec<i8>> {
        let offset = self.offset;
        let weights = self.map(out_features * in_features)?.to_vec();
        tracing::debug!(
            "loaded fc weights {}x{} = {} (offset {})",
            out_features, in_features, weights.len(), offset
        );
        Ok(weights)
    }

    /// `size` biases, one blob value each, widened to the accumulator type.
    pub fn load_bias(&mut self, size: usize) -> CnnResult<Vec<i32>> {
        let offset = self.offset;
        let bias: Vec<i32> = self.map(size)?.iter().map(|&b| i32::from(b)).collect();
        tracing::debug!("loaded bias {} (offset {})", size, offset);
        Ok(bias)
    }

    pub fn skip(&mut self, n: usize) -> CnnResult<()> {
        self.map(n).map(|_| ())
    }

    /// Checks that exactly `expected_total` values were consumed and that nothing
    /// follows them in the blob.
    pub fn finish(&self, expected_total: usize) -> CnnResult<()> {
        if self.offset != expected_total {
            return Err(CnnError::WeightBlobSizeMismatch {
                expected: expected_total,
                actual: self.offset,
            });
        }
        if self.blob.len() != expected_total {
            return Err(CnnError::WeightBlobSizeMismatch {
                expected: expected_total,
                actual: self.blob.len(),
            });
        }
        Ok(())
    }
}

/// Reinterprets raw bytes as signed weights.
pub fn blob_from_bytes(bytes: &[u8]) -> Vec<i8> {
    bytes.iter().map(|&b| b as i8).collect()
}

/// Reads a raw weight blob from disk. Paths ending in `.gz` are gunzipped.
pub fn load_blob_file<P: AsRef<Path>>(path: P) -> CnnResult<Vec<i8>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    tracing::info!("read {} weight values from {}", bytes.len(), path.display());
    Ok(blob_from_bytes(&bytes))
}
