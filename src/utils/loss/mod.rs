use burn::prelude::*;

use crate::utils::log_sigmoid::log_sigmoid;

/// Base elementwise loss selectable per configuration.
#[derive(Config, Debug, PartialEq)]
pub enum LossKind {
    /// Binary cross-entropy on logits.
    Bce,
    /// Mean squared error on raw outputs.
    Mse,
}

/// Reduction applied over the contributing positions.
#[derive(Config, Debug, PartialEq)]
pub enum MaskedReduction {
    Mean,
    Sum,
}

/// Loss restricted to the positions a problem marks as contributing.
///
/// Masked-out positions are multiplied by zero before reduction, so
/// their values can never influence the result.
#[derive(Debug, Clone)]
pub struct MaskedLoss {
    pub kind: LossKind,
    pub reduction: MaskedReduction,
}

impl MaskedLoss {
    /// Create the criterion.
    pub fn new(kind: LossKind, reduction: MaskedReduction) -> Self {
        Self { kind, reduction }
    }

    /// Compute the criterion on the input tensor.
    ///
    /// # Shapes
    ///   - logits [batch, sequence, output_size]
    ///   - targets [batch, sequence, output_size]
    ///   - mask [batch, sequence]
    ///   - output [1]
    pub fn forward<B: Backend>(
        &self,
        logits: Tensor<B, 3>,
        targets: Tensor<B, 3>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let [batch, sequence, output_size] = logits.dims();
        debug_assert_eq!([batch, sequence, output_size], targets.dims());
        debug_assert_eq!([batch, sequence], mask.dims());

        let elementwise = self.forward_no_reduction(logits, targets);

        let mask: Tensor<B, 3> = mask.unsqueeze_dim(2);
        debug_assert_eq!([batch, sequence, 1], mask.dims());
        let masked = elementwise * mask.clone();

        match self.reduction {
            MaskedReduction::Sum => masked.sum(),
            MaskedReduction::Mean => {
                let count = mask.sum() * (output_size as f32);
                masked.sum() / count.clamp_min(1.)
            }
        }
    }

    /// Compute the criterion on the input tensor without masking or
    /// reducing.
    pub fn forward_no_reduction<B: Backend>(
        &self,
        logits: Tensor<B, 3>,
        targets: Tensor<B, 3>,
    ) -> Tensor<B, 3> {
        match self.kind {
            LossKind::Bce => {
                // numerically stable `BCE(sigmoid(x), t)`, combining the
                // sigmoid with the log term
                (targets.neg() + 1.) * logits.clone() - log_sigmoid(logits)
            }
            LossKind::Mse => logits.sub(targets).powi_scalar(2),
        }
    }
}
