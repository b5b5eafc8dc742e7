use std::fmt;

use crate::error::{CnnError, CnnResult};

/// A 3D INT8 activation tensor.
///
/// Layout is CHW: channels outermost, row-major within a channel. Every sample is an
/// `i8`, so the [-128, 127] range holds by construction.
#[derive(Clone, PartialEq, Eq)]
pub struct TensorI8 {
    pub c: usize,
    pub h: usize,
    pub w: usize,
    pub data: Vec<i8>,
}

impl TensorI8 {
    pub fn new(c: usize, h: usize, w: usize) -> Self {
        TensorI8 {
            c,
            h,
            w,
            data: vec![0i8; c * h * w],
        }
    }

    /// A flat vector of `n` features (`n x 1 x 1`).
    pub fn new1(n: usize) -> Self {
        Self::new(n, 1, 1)
    }

    /// Wraps an existing CHW buffer, checking its length against the shape.
    pub fn from_vec(c: usize, h: usize, w: usize, data: Vec<i8>) -> CnnResult<Self> {
        if data.len() != c * h * w {
            return Err(CnnError::InvalidInputLength {
                expected: c * h * w,
                actual: data.len(),
            });
        }
        Ok(TensorI8 { c, h, w, data })
    }

    #[inline]
    pub fn index(&self, c: usize, h: usize, w: usize) -> usize {
        c * self.h * self.w + h * self.w + w
    }

    pub fn get(&self, c: usize, h: usize, w: usize) -> i8 {
        self.data[self.index(c, h, w)]
    }

    pub fn set(&mut self, c: usize, h: usize, w: usize, val: i8) {
        let idx = self.index(c, h, w);
        self.data[idx] = val;
    }

    pub fn fill(&mut self, val: i8) {
        self.data.fill(val);
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.c, self.h, self.w)
    }

    pub fn as_slice(&self) -> &[i8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [i8] {
        &mut self.data
    }

    pub fn memory_bytes(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Display for TensorI8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{} (i8)", self.c, self.h, self.w)
    }
}

impl fmt::Debug for TensorI8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorI8({})", self)
    }
}
