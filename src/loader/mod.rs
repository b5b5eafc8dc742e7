//! Loaders for the external inputs: the flat weight blob and the HWC input image.

mod image;
mod weights;

pub use image::{image_from_hwc_u8, load_image_file, write_image_from_hwc_u8};
pub use weights::{blob_from_bytes, load_blob_file, WeightStream};
