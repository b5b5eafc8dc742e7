//! Error type shared by the loader, the layer configs and the pipeline.

use thiserror::Error;

use crate::network::LayerType;

/// Everything that can go wrong while building or driving the network.
///
/// Arithmetic saturation is not represented here: accumulators are clamped by
/// [`crate::quantization`] and that is the intended behaviour.
#[derive(Debug, Error)]
pub enum CnnError {
    #[error("weight blob exhausted: requested {requested} values at offset {offset}, blob holds {available}")]
    InsufficientWeightData {
        requested: usize,
        offset: usize,
        available: usize,
    },

    #[error("weight blob size mismatch: expected {expected} values, got {actual}")]
    WeightBlobSizeMismatch { expected: usize, actual: usize },

    #[error("flatten size mismatch: propagated dims give {computed}, FC1 expects {declared}")]
    FlattenMismatch { computed: usize, declared: usize },

    #[error("{layer}: input extent {input} is too small for window {kernel}")]
    DegenerateDimension {
        layer: LayerType,
        input: usize,
        kernel: usize,
    },

    #[error("{layer}: extent {size} is not divisible by pool size {pool}")]
    UnevenPooling {
        layer: LayerType,
        size: usize,
        pool: usize,
    },

    #[error("{layer}: expects {expected} input values but the previous stage produces {actual}")]
    LayerChainMismatch {
        layer: LayerType,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported config in {layer}: {msg}")]
    UnsupportedConfig { layer: LayerType, msg: String },

    #[error("input shape mismatch: expected {expected:?} (c, h, w), got {actual:?}")]
    InputShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("invalid input length: expected {expected}, got {actual}")]
    InvalidInputLength { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CnnResult<T> = Result<T, CnnError>;
