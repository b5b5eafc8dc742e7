use std::fs;
use std::path::Path;

use crate::error::{CnnError, CnnResult};
use crate::quantization::pixel_to_activation;
use crate::tensor::TensorI8;

/// Converts an interleaved HWC `u8` image into a CHW `i8` tensor (`byte - 128`).
pub fn image_from_hwc_u8(bytes: &[u8], channels: usize, h: usize, w: usize) -> CnnResult<TensorI8> {
    let mut tensor = TensorI8::new(channels, h, w);
    write_image_from_hwc_u8(bytes, &mut tensor)?;
    Ok(tensor)
}

/// Same as [`image_from_hwc_u8`] but writes into an existing tensor, so a caller
/// can reuse one input buffer across inferences.
pub fn write_image_from_hwc_u8(bytes: &[u8], tensor: &mut TensorI8) -> CnnResult<()> {
    let (c, h, w) = tensor.shape();
    if bytes.len() != c * h * w {
        return Err(CnnError::InvalidInputLength {
            expected: c * h * w,
            actual: bytes.len(),
        });
    }
    for row in 0..h {
        for col in 0..w {
            for ch in 0..c {
                let idx = (row * w + col) * c + ch;
                tensor.set(ch, row, col, pixel_to_activation(bytes[idx]));
            }
        }
    }
    Ok(())
}

/// Reads a raw HWC `u8` image of the given shape from disk.
pub fn load_image_file<P: AsRef<Path>>(path: P, channels: usize, h: usize, w: usize) -> CnnResult<TensorI8> {
    let bytes = fs::read(path.as_ref())?;
    tracing::info!("read {}x{}x{} image from {}", h, w, channels, path.as_ref().display());
    image_from_hwc_u8(&bytes, channels, h, w)
}
