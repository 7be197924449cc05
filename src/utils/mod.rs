use burn::prelude::*;
use burn::tensor::{DType, Element};

pub mod log_sigmoid;
pub mod loss;
pub mod softplus;

/// Division epsilon matched to the backend's float precision.
///
/// Added to denominators so that an all-zero vector yields 0 instead of
/// NaN in similarity computations. Only float-element backends reach
/// this path.
pub fn div_eps<B: Backend>() -> f32 {
    match <B::FloatElem as Element>::dtype() {
        DType::F64 => 4.1e-16,
        DType::F16 => 7.1e-4,
        DType::BF16 => 2.1e-5,
        _ => 8.2e-8,
    }
}
