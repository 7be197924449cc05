use burn::prelude::*;

use crate::utils::softplus::softplus;

/// Applies the log sigmoid function element-wise.
///
/// `log_sigmoid(x) = -softplus(-x)`, which stays finite for large
/// negative inputs where `log(1 / (1 + exp(-x)))` would not.
pub fn log_sigmoid<const D: usize, B: Backend>(x: Tensor<B, D>) -> Tensor<B, D> {
    softplus(x.neg()).neg()
}
