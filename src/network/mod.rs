/// INT8 layer engines (pooling, dense, flatten, dropout) and the layer trait.
mod layers_i8;

pub use layers_i8::*;

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{CnnError, CnnResult};

/// Identifies the type of a layer in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Conv2dReLu,
    AvgPool2d,
    MaxPool2d,
    Flatten,
    /// Dense layer with ReLU-saturation.
    LinearReLu,
    /// Dense layer with sign-preserving clamp.
    Linear,
    Dropout,
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerType::Conv2dReLu => write!(f, "Conv2d+ReLu"),
            LayerType::AvgPool2d => write!(f, "AvgPool2d"),
            LayerType::MaxPool2d => write!(f, "MaxPool2d"),
            LayerType::Flatten => write!(f, "Flatten"),
            LayerType::LinearReLu => write!(f, "Linear+ReLu"),
            LayerType::Linear => write!(f, "Linear"),
            LayerType::Dropout => write!(f, "Dropout"),
        }
    }
}

/// A straight-line INT8 network that owns every intermediate buffer.
///
/// Buffers are allocated in [`add`](Self::add) and overwritten on every call to
/// [`predict`](Self::predict); nothing is allocated on the inference path.
pub struct QuantizedNeuralNetwork {
    input_len: usize,
    layers: Vec<Box<dyn QuantizedLayer>>,
    buffers: Vec<Vec<i8>>,
}

impl QuantizedNeuralNetwork {
    pub fn new(input_len: usize) -> Self {
        QuantizedNeuralNetwork {
            input_len,
            layers: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Appends a layer, checking that it consumes exactly what the previous stage
    /// produces.
    pub fn add(&mut self, layer: Box<dyn QuantizedLayer>) -> CnnResult<()> {
        let produced = self.buffers.last().map_or(self.input_len, Vec::len);
        if layer.input_len() != produced {
            return Err(CnnError::LayerChainMismatch {
                layer: layer.layer_type(),
                expected: layer.input_len(),
                actual: produced,
            });
        }
        self.buffers.push(vec![0i8; layer.output_len()]);
        self.layers.push(layer);
        Ok(())
    }

    fn check_input(&self, input: &[i8]) -> CnnResult<()> {
        if input.len() != self.input_len {
            return Err(CnnError::InvalidInputLength {
                expected: self.input_len,
                actual: input.len(),
            });
        }
        Ok(())
    }

    fn forward_layer(&mut self, idx: usize, input: &[i8]) {
        let (done, rest) = self.buffers.split_at_mut(idx);
        let src: &[i8] = if idx == 0 { input } else { &done[idx - 1] };
        self.layers[idx].fwd_i8(src, &mut rest[0]);
    }

    /// Runs every layer in order and returns the final layer's output.
    pub fn predict(&mut self, input: &[i8]) -> CnnResult<&[i8]> {
        self.check_input(input)?;
        for idx in 0..self.layers.len() {
            self.forward_layer(idx, input);
            if tracing::enabled!(tracing::Level::TRACE) {
                let stats = crate::benchmark::feature_map_stats(&self.buffers[idx]);
                tracing::trace!(layer = idx, kind = %self.layers[idx].layer_type(), %stats, "feature map");
            }
        }
        Ok(self.output())
    }

    /// Like [`predict`](Self::predict), also returning the wall time of each layer.
    pub fn predict_timed(&mut self, input: &[i8]) -> CnnResult<Vec<(LayerType, Duration)>> {
        self.check_input(input)?;
        let mut timings = Vec::with_capacity(self.layers.len());
        for idx in 0..self.layers.len() {
            let start = Instant::now();
            self.forward_layer(idx, input);
            timings.push((self.layers[idx].layer_type(), start.elapsed()));
        }
        Ok(timings)
    }

    /// Output of the last layer from the most recent inference.
    pub fn output(&self) -> &[i8] {
        self.buffers.last().map_or(&[][..], Vec::as_slice)
    }

    /// Each layer's output from the most recent inference, in execution order.
    pub fn intermediates(&self) -> impl Iterator<Item = (LayerType, &[i8])> + '_ {
        self.layers
            .iter()
            .zip(self.buffers.iter())
            .map(|(l, b)| (l.layer_type(), b.as_slice()))
    }

    pub fn layers(&self) -> &[Box<dyn QuantizedLayer>] {
        &self.layers
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn layer_weight_memory(&self) -> Vec<usize> {
        self.layers.iter().map(|l| l.weight_memory_bytes()).collect()
    }

    /// Bytes held by the intermediate feature-map buffers.
    pub fn buffer_memory_bytes(&self) -> usize {
        self.buffers.iter().map(Vec::len).sum()
    }
}
