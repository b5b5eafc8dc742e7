//! Streaming line-buffer convolution.
//!
//! The input arrives as one raster-scan stream with the channel index innermost:
//! for every `(row, col)` all input channels are pushed before the next column
//! (HWC order). Channels therefore advance in lockstep, and when the last channel
//! of a position has been pushed every channel's window holds the same spatial
//! neighbourhood.
//!
//! State per input channel:
//! - `K-1` rows of width `in_w` holding the previous `K-1` input rows,
//! - a `K x K` window whose right-most column is the column just pushed.
//!
//! Nothing larger than that is ever stored, so memory is
//! `in_ch * ((K-1) * in_w + K * K)` bytes regardless of the input height.

use super::simd;
use super::ConvGeometry;
use crate::quantization::saturate_relu;

/// One computed output pixel: all output channels for `(oh, ow)`.
#[derive(Debug, PartialEq, Eq)]
pub struct Emission<'a> {
    pub oh: usize,
    pub ow: usize,
    pub values: &'a [i8],
}

/// Bounded-memory convolution engine consuming one input sample per [`push`](Self::push).
pub struct LineBufferConv {
    geometry: ConvGeometry,
    /// `[in_ch][K-1][in_w]`
    line_buf: Vec<i8>,
    /// `[in_ch][K][K]`, same order as one output channel's weights.
    window: Vec<i8>,
    /// `[out_ch]`, reused for every emission.
    out_pixel: Vec<i8>,
    row: usize,
    col: usize,
    ch: usize,
}

impl LineBufferConv {
    /// Allocates the line buffers for `geometry`. The geometry is expected to have
    /// passed [`ConvGeometry::validate`].
    pub fn new(geometry: ConvGeometry) -> Self {
        let k = geometry.kernel_size;
        LineBufferConv {
            geometry,
            line_buf: vec![0i8; geometry.in_channels * k.saturating_sub(1) * geometry.in_w],
            window: vec![0i8; geometry.in_channels * k * k],
            out_pixel: vec![0i8; geometry.out_channels],
            row: 0,
            col: 0,
            ch: 0,
        }
    }

    pub fn geometry(&self) -> &ConvGeometry {
        &self.geometry
    }

    /// Rewinds the stream cursor to the first sample of a frame.
    ///
    /// Buffer contents are left as they are: every slot is rewritten before an
    /// emission can read it.
    pub fn reset(&mut self) {
        self.row = 0;
        self.col = 0;
        self.ch = 0;
    }

    /// Current stream position as `(row, col, ch)` of the next expected sample.
    pub fn position(&self) -> (usize, usize, usize) {
        (self.row, self.col, self.ch)
    }

    /// Bytes of streaming state (line buffers plus windows).
    pub fn state_bytes(&self) -> usize {
        self.line_buf.len() + self.window.len()
    }

    /// Feeds the next sample of the stream.
    ///
    /// Returns the output pixel once the last input channel of a valid window
    /// position has been consumed. After the final sample of a frame the cursor
    /// wraps to the start of the next frame.
    pub fn push(&mut self, pixel: i8, weights: &[i8], bias: &[i32]) -> Option<Emission<'_>> {
        let ConvGeometry {
            in_channels,
            out_channels,
            kernel_size: k,
            stride,
            in_h,
            in_w,
            ..
        } = self.geometry;
        let (row, col, ch) = (self.row, self.col, self.ch);
        let lb_rows = k - 1;
        let lb_base = ch * lb_rows * in_w;
        let win_base = ch * k * k;

        // window: slide one column left, append [line_buf[..][col], pixel] on the right
        for i in 0..k {
            let r = win_base + i * k;
            self.window.copy_within(r + 1..r + k, r);
        }
        for i in 0..lb_rows {
            self.window[win_base + i * k + k - 1] = self.line_buf[lb_base + i * in_w + col];
        }
        self.window[win_base + (k - 1) * k + k - 1] = pixel;

        // line buffer: drop the oldest row at `col`, newest pixel into the last slot
        if lb_rows > 0 {
            for i in 0..lb_rows - 1 {
                self.line_buf[lb_base + i * in_w + col] = self.line_buf[lb_base + (i + 1) * in_w + col];
            }
            self.line_buf[lb_base + (lb_rows - 1) * in_w + col] = pixel;
        }

        let emit = ch == in_channels - 1
            && row >= k - 1
            && col >= k - 1
            && (row - (k - 1)) % stride == 0
            && (col - (k - 1)) % stride == 0;

        if emit {
            let taps = in_channels * k * k;
            for oc in 0..out_channels {
                let sum = bias[oc] + simd::dot_i8(&self.window, 0, weights, oc * taps, taps);
                self.out_pixel[oc] = saturate_relu(sum);
            }
        }

        self.advance(in_channels, in_h, in_w);

        if emit {
            Some(Emission {
                oh: (row - (k - 1)) / stride,
                ow: (col - (k - 1)) / stride,
                values: &self.out_pixel,
            })
        } else {
            None
        }
    }

    fn advance(&mut self, in_channels: usize, in_h: usize, in_w: usize) {
        self.ch += 1;
        if self.ch < in_channels {
            return;
        }
        self.ch = 0;
        self.col += 1;
        if self.col < in_w {
            return;
        }
        self.col = 0;
        self.row += 1;
        if self.row == in_h {
            self.row = 0;
        }
    }
}

/// Runs a full CHW feature map through `engine` and scatters the emissions into a
/// CHW output, making the streaming engine a drop-in for
/// [`conv2d_direct_i8`](super::conv2d_direct_i8).
///
/// The map is fed in lockstep channel order (`row`, `col`, then `ch`).
pub fn conv2d_line_buffer_i8(
    engine: &mut LineBufferConv,
    input: &[i8],
    weights: &[i8],
    bias: &[i32],
    output: &mut [i8],
) {
    let geometry = *engine.geometry();
    let plane = geometry.in_h * geometry.in_w;
    let out_w = geometry.out_w();
    let out_plane = geometry.out_h() * out_w;

    engine.reset();
    for row in 0..geometry.in_h {
        for col in 0..geometry.in_w {
            for ch in 0..geometry.in_channels {
                let pixel = input[ch * plane + row * geometry.in_w + col];
                if let Some(e) = engine.push(pixel, weights, bias) {
                    let base = e.oh * out_w + e.ow;
                    for (oc, &v) in e.values.iter().enumerate() {
                        output[oc * out_plane + base] = v;
                    }
                }
            }
        }
    }
}
