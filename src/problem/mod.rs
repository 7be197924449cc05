mod serial_recall;

pub use serial_recall::{SerialRecall, SerialRecallConfig};

use burn::prelude::*;

/// One batch produced by a problem generator.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// # Shape
    /// [batch, sequence, input_size]
    pub input: Tensor<B, 3>,

    /// # Shape
    /// [batch, sequence, output_size]
    pub target: Tensor<B, 3>,

    /// 1.0 where the position contributes to the loss.
    ///
    /// # Shape
    /// [batch, sequence]
    pub mask: Tensor<B, 2>,
}

/// Contract for external sequence generators.
///
/// `max_length` is the curriculum scheduler's current bound, which the
/// generator must respect.
pub trait Problem<B: Backend> {
    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    fn generate(
        &mut self,
        max_length: usize,
        batch_size: usize,
        device: &B::Device,
    ) -> SequenceBatch<B>;
}
