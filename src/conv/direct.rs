use super::simd;
use super::ConvGeometry;
use crate::quantization::saturate_relu;

/// Direct INT8 convolution (reference implementation).
///
/// For every output position accumulates
/// `bias[oc] + sum(input[ic][oh*s+kh][ow*s+kw] * weights[oc][ic][kh][kw])` in `i32`
/// and narrows with ReLU-saturation. Input, weights and output are flat CHW /
/// OIHW slices. The geometry must have passed [`ConvGeometry::validate`]; no bounds
/// are re-checked here.
pub fn conv2d_direct_i8(
    input: &[i8],
    geometry: &ConvGeometry,
    weights: &[i8],
    bias: &[i32],
    output: &mut [i8],
) {
    let ConvGeometry {
        in_channels,
        out_channels,
        kernel_size,
        stride,
        in_h,
        in_w,
        ..
    } = *geometry;
    let out_h = geometry.out_h();
    let out_w = geometry.out_w();
    let k2 = kernel_size * kernel_size;

    for oc in 0..out_channels {
        let w_oc = oc * in_channels * k2;
        for oh in 0..out_h {
            for ow in 0..out_w {
                let mut sum: i32 = bias[oc];
                for ic in 0..in_channels {
                    for kh in 0..kernel_size {
                        let ih = oh * stride + kh;
                        let iw = ow * stride;
                        let in_off = ic * in_h * in_w + ih * in_w + iw;
                        let w_off = w_oc + ic * k2 + kh * kernel_size;
                        // one kernel row against one contiguous input row segment
                        sum += simd::dot_i8(input, in_off, weights, w_off, kernel_size);
                    }
                }
                output[oc * out_h * out_w + oh * out_w + ow] = saturate_relu(sum);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_shifts_the_accumulator() {
        let geometry = ConvGeometry::new(1, 2, 1, 1, 1, 2);
        let input = [3i8, -4];
        let weights = [2i8, 1];
        let bias = [10i32, -10];
        let mut output = [0i8; 4];
        conv2d_direct_i8(&input, &geometry, &weights, &bias, &mut output);
        // oc0: 10 + 2*x, oc1: -10 + x
        assert_eq!(output, [16, 2, 0, 0]);
    }
}
