//! A fixed-topology INT8 CNN ("ship detector") for resource-constrained targets.
//!
//! Every layer works on `i8` activations and weights with `i32` accumulation, and
//! narrows through one explicit saturation policy. Convolutions run either on full
//! feature maps (the direct reference engine) or as a single raster-scan stream
//! through a line-buffer engine holding only `K-1` rows per channel; the two are
//! bit-identical.
//!
//! # Example
//!
//! ```no_run
//! use shipcnn::loader::{load_blob_file, load_image_file};
//! use shipcnn::ship_detector::{PipelineConfig, ShipDetector};
//!
//! # fn main() -> shipcnn::error::CnnResult<()> {
//! let blob = load_blob_file("data/ship_weights.bin")?;
//! let config = PipelineConfig::default();
//! let mut detector = ShipDetector::from_blob(&blob, config)?;
//! let image = load_image_file("data/ship.rgb", 3, config.input.h, config.input.w)?;
//! let class = detector.classify(&image)?;
//! # let _ = class;
//! # Ok(())
//! # }
//! ```

/// Crate error type.
pub mod error;
/// INT8 CHW tensor.
pub mod tensor;
/// Fixed-point numeric policy: saturating casts and activation modes.
#[path = "arc/quantization.rs"]
pub mod quantization;
/// Direct and streaming line-buffer convolution engines.
pub mod conv;
/// Pooling, dense, flatten and dropout layers, and the layer pipeline.
pub mod network;
/// Weight-blob stream and input-image loaders.
pub mod loader;
/// Ship-detector topology, dimension propagation and pipeline builder.
#[path = "arc/ship_detector.rs"]
pub mod ship_detector;
/// Engine comparison benchmark and feature-map statistics.
#[path = "metrics/benchmark.rs"]
pub mod benchmark;
