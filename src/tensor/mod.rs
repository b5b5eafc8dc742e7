mod tensor_i8;

pub use tensor_i8::TensorI8;
