//! Fixed-point numeric policy.
//!
//! Activations and weights are `i8`; every reduction accumulates in `i32` and is
//! narrowed back to `i8` through exactly one of the two saturating casts below.

/// Lower bound of the activation range.
pub const ACT_MIN: i32 = i8::MIN as i32;
/// Upper bound of the activation range.
pub const ACT_MAX: i32 = i8::MAX as i32;

/// ReLU followed by saturation: negative values become 0, values above 127 become 127.
#[inline(always)]
pub fn saturate_relu(acc: i32) -> i8 {
    if acc > ACT_MAX {
        return i8::MAX;
    }
    if acc < 0 {
        return 0;
    }
    acc as i8
}

/// Sign-preserving saturation to [-128, 127]. Only the classifier head uses it.
#[inline(always)]
pub fn saturate_clamp(acc: i32) -> i8 {
    if acc > ACT_MAX {
        return i8::MAX;
    }
    if acc < ACT_MIN {
        return i8::MIN;
    }
    acc as i8
}

/// Output policy of a layer that narrows an accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// [`saturate_relu`]. Used after every convolution and after FC1.
    Relu,
    /// [`saturate_clamp`]. Keeps negative class scores for the final FC layer.
    Clamp,
}

impl Activation {
    #[inline(always)]
    pub fn apply(self, acc: i32) -> i8 {
        match self {
            Activation::Relu => saturate_relu(acc),
            Activation::Clamp => saturate_clamp(acc),
        }
    }
}

/// Converts an unsigned 8-bit pixel into the signed activation domain (`byte - 128`).
#[inline(always)]
pub fn pixel_to_activation(byte: u8) -> i8 {
    (i16::from(byte) - 128) as i8
}
