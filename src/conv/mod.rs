//! INT8 convolution engines.
//!
//! Two interchangeable realizations of the same contract: a direct buffer-to-buffer
//! reference and a single-pass line-buffer engine that consumes the input as a
//! raster-scan stream. Both narrow through [`saturate_relu`](crate::quantization::saturate_relu).

mod direct;
mod line_buffer;
pub(crate) mod simd;

pub use direct::conv2d_direct_i8;
pub use line_buffer::{conv2d_line_buffer_i8, Emission, LineBufferConv};

use crate::error::{CnnError, CnnResult};
use crate::network::LayerType;

/// Selects which convolution engine the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvAlgorithm {
    /// Direct 6-nested-loop convolution over full feature maps (reference).
    Direct,
    /// Streaming line-buffer convolution with `K-1` rows of state per channel.
    #[default]
    LineBuffer,
}

/// Output extent of a convolution: `floor((in + 2*pad - kernel) / stride) + 1`.
///
/// Returns `None` when the window does not fit or the stride is zero.
pub fn conv_out_size(in_size: usize, kernel: usize, stride: usize, pad: usize) -> Option<usize> {
    let padded = in_size + 2 * pad;
    if stride == 0 || kernel == 0 || padded < kernel {
        return None;
    }
    Some((padded - kernel) / stride + 1)
}

/// Static shape of one convolution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    pub stride: usize,
    pub pad: usize,
    pub in_h: usize,
    pub in_w: usize,
}

impl ConvGeometry {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        in_h: usize,
        in_w: usize,
    ) -> Self {
        ConvGeometry {
            in_channels,
            out_channels,
            kernel_size,
            stride,
            pad: 0,
            in_h,
            in_w,
        }
    }

    /// Rejects shapes neither engine can run. Called once at pipeline construction;
    /// the engines themselves assume a validated geometry.
    pub fn validate(&self) -> CnnResult<()> {
        let layer = LayerType::Conv2dReLu;
        if self.pad != 0 {
            return Err(CnnError::UnsupportedConfig {
                layer,
                msg: format!("padding {} (only 0 is supported)", self.pad),
            });
        }
        if self.stride == 0 {
            return Err(CnnError::UnsupportedConfig {
                layer,
                msg: "stride must be at least 1".to_string(),
            });
        }
        if self.in_channels == 0 || self.out_channels == 0 {
            return Err(CnnError::UnsupportedConfig {
                layer,
                msg: format!("channels {}->{}", self.in_channels, self.out_channels),
            });
        }
        if self.kernel_size == 0 || self.in_h < self.kernel_size {
            return Err(CnnError::DegenerateDimension {
                layer,
                input: self.in_h,
                kernel: self.kernel_size,
            });
        }
        if self.in_w < self.kernel_size {
            return Err(CnnError::DegenerateDimension {
                layer,
                input: self.in_w,
                kernel: self.kernel_size,
            });
        }
        Ok(())
    }

    pub fn out_h(&self) -> usize {
        conv_out_size(self.in_h, self.kernel_size, self.stride, self.pad).unwrap_or(0)
    }

    pub fn out_w(&self) -> usize {
        conv_out_size(self.in_w, self.kernel_size, self.stride, self.pad).unwrap_or(0)
    }

    pub fn input_len(&self) -> usize {
        self.in_channels * self.in_h * self.in_w
    }

    pub fn output_len(&self) -> usize {
        self.out_channels * self.out_h() * self.out_w()
    }

    /// Number of weights, `out_ch * in_ch * k * k`.
    pub fn weight_len(&self) -> usize {
        self.out_channels * self.in_channels * self.kernel_size * self.kernel_size
    }
}

/// Dispatch convolution to the selected engine.
///
/// `input` and `output` are flat CHW slices sized by `geometry`. `line_buffer` is the
/// reusable streaming state; it is ignored by the direct engine.
pub fn conv2d_i8(
    algorithm: ConvAlgorithm,
    input: &[i8],
    geometry: &ConvGeometry,
    weights: &[i8],
    bias: &[i32],
    line_buffer: &mut LineBufferConv,
    output: &mut [i8],
) {
    match algorithm {
        ConvAlgorithm::Direct => conv2d_direct_i8(input, geometry, weights, bias, output),
        ConvAlgorithm::LineBuffer => {
            conv2d_line_buffer_i8(line_buffer, input, weights, bias, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_size_formula() {
        assert_eq!(conv_out_size(128, 3, 1, 0), Some(126));
        assert_eq!(conv_out_size(30, 3, 2, 0), Some(14));
        assert_eq!(conv_out_size(33, 3, 2, 0), Some(16));
        assert_eq!(conv_out_size(2, 3, 1, 0), None);
        assert_eq!(conv_out_size(8, 3, 0, 0), None);
    }

    #[test]
    fn validate_rejects_padding_and_tiny_inputs() {
        let mut g = ConvGeometry::new(1, 1, 3, 1, 4, 4);
        assert!(g.validate().is_ok());
        g.pad = 1;
        assert!(matches!(g.validate(), Err(CnnError::UnsupportedConfig { .. })));
        let g = ConvGeometry::new(1, 1, 3, 1, 2, 4);
        assert!(matches!(g.validate(), Err(CnnError::DegenerateDimension { .. })));
    }
}
