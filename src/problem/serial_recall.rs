use burn::prelude::*;
use burn::tensor::TensorData;
use rand::Rng;
use rand::rngs::StdRng;

use crate::context::RunContext;
use crate::problem::{Problem, SequenceBatch};

/// Serial-recall (copy) task: a marked storage phase of random bit
/// patterns followed by a recall phase during which the model must
/// reproduce them.
///
/// Control channel 0 carries the storage marker at the first position,
/// channel 1 the recall marker right after the data; the loss mask
/// covers exactly the recall positions.
#[derive(Config, Debug)]
pub struct SerialRecallConfig {
    /// Control channels prepended to every item; at least 2.
    #[config(default = 2)]
    pub control_bits: usize,

    /// Width of the random bit patterns.
    #[config(default = 8)]
    pub data_bits: usize,

    /// Lower bound for the sampled sequence length.
    #[config(default = 1)]
    pub min_length: usize,

    /// Probability of a data bit being 1.
    #[config(default = 0.5)]
    pub bias: f64,
}

impl SerialRecallConfig {
    /// Returns the initialized generator with its own rng stream.
    pub fn init(&self, ctx: &mut RunContext) -> SerialRecall {
        SerialRecall {
            control_bits: self.control_bits.max(2),
            data_bits: self.data_bits,
            min_length: self.min_length.max(1),
            bias: self.bias,
            rng: ctx.rng(),
        }
    }
}

#[derive(Debug)]
pub struct SerialRecall {
    control_bits: usize,
    data_bits: usize,
    min_length: usize,
    bias: f64,
    rng: StdRng,
}

impl<B: Backend> Problem<B> for SerialRecall {
    fn input_size(&self) -> usize {
        self.control_bits + self.data_bits
    }

    fn output_size(&self) -> usize {
        self.data_bits
    }

    /// The sampled length is shared across the batch.
    ///
    /// # Shapes
    ///   - input [batch, 2 * length + 2, control_bits + data_bits]
    ///   - target [batch, 2 * length + 2, data_bits]
    ///   - mask [batch, 2 * length + 2]
    fn generate(
        &mut self,
        max_length: usize,
        batch_size: usize,
        device: &B::Device,
    ) -> SequenceBatch<B> {
        let length = self
            .rng
            .random_range(self.min_length..=max_length.max(self.min_length));
        let input_size = self.control_bits + self.data_bits;
        let total = 2 * length + 2;

        let mut input = vec![0f32; batch_size * total * input_size];
        let mut target = vec![0f32; batch_size * total * self.data_bits];
        let mut mask = vec![0f32; batch_size * total];

        for b in 0..batch_size {
            // storage marker at t = 0, recall marker at t = length + 1
            input[b * total * input_size] = 1.0;
            input[(b * total + length + 1) * input_size + 1] = 1.0;

            for t in 0..length {
                for i in 0..self.data_bits {
                    let bit = if self.rng.random_bool(self.bias) { 1.0 } else { 0.0 };
                    input[(b * total + 1 + t) * input_size + self.control_bits + i] = bit;
                    target[(b * total + length + 2 + t) * self.data_bits + i] = bit;
                }
                mask[b * total + length + 2 + t] = 1.0;
            }
        }

        SequenceBatch {
            input: Tensor::from_data(
                TensorData::new(input, [batch_size, total, input_size]),
                device,
            ),
            target: Tensor::from_data(
                TensorData::new(target, [batch_size, total, self.data_bits]),
                device,
            ),
            mask: Tensor::from_data(TensorData::new(mask, [batch_size, total]), device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray<f32>;

    fn data<const D: usize>(t: Tensor<TB, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn batches_have_aligned_shapes_and_masks() {
        let device = Default::default();
        let mut ctx = RunContext::new(11);
        let mut problem = SerialRecallConfig::new().with_data_bits(4).init(&mut ctx);

        let batch: SequenceBatch<TB> = problem.generate(5, 3, &device);
        let [batch_size, total, input_size] = batch.input.dims();

        assert_eq!(3, batch_size);
        assert_eq!(6, input_size);
        assert_eq!(0, total % 2);
        let length = (total - 2) / 2;
        assert!((1..=5).contains(&length));
        assert_eq!([batch_size, total, 4], batch.target.dims());
        assert_eq!([batch_size, total], batch.mask.dims());

        // mask covers exactly the recall phase
        let mask = data(batch.mask);
        for row in mask.chunks(total) {
            let count: f32 = row.iter().sum();
            assert_eq!(length as f32, count);
            assert!(row[..length + 2].iter().all(|m| *m == 0.0));
            assert!(row[length + 2..].iter().all(|m| *m == 1.0));
        }
    }

    #[test]
    fn targets_replay_the_stored_bits() {
        let device = Default::default();
        let mut ctx = RunContext::new(23);
        let mut problem = SerialRecallConfig::new()
            .with_data_bits(3)
            .with_min_length(4)
            .init(&mut ctx);

        let batch: SequenceBatch<TB> = problem.generate(4, 2, &device);
        let [_batch_size, total, input_size] = batch.input.dims();
        let length = (total - 2) / 2;
        assert_eq!(4, length);

        let input = data(batch.input);
        let target = data(batch.target);
        for b in 0..2 {
            for t in 0..length {
                for i in 0..3 {
                    let stored = input[(b * total + 1 + t) * input_size + 2 + i];
                    let recalled = target[(b * total + length + 2 + t) * 3 + i];
                    assert_eq!(stored, recalled);
                }
            }
        }
    }

    #[test]
    fn markers_sit_on_their_own_channels() {
        let device = Default::default();
        let mut ctx = RunContext::new(5);
        let mut problem = SerialRecallConfig::new().with_data_bits(2).init(&mut ctx);

        let batch: SequenceBatch<TB> = problem.generate(3, 1, &device);
        let [_batch_size, total, input_size] = batch.input.dims();
        let length = (total - 2) / 2;

        let input = data(batch.input);
        assert_eq!(1.0, input[0]);
        assert_eq!(1.0, input[(length + 1) * input_size + 1]);
        // no data bits on marker positions
        assert!(input[2..input_size].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn same_seed_produces_the_same_batch() {
        let device = Default::default();

        let mut a = SerialRecallConfig::new().init(&mut RunContext::new(42));
        let mut b = SerialRecallConfig::new().init(&mut RunContext::new(42));

        let x: SequenceBatch<TB> = a.generate(6, 2, &device);
        let y: SequenceBatch<TB> = b.generate(6, 2, &device);
        assert_eq!(data(x.input), data(y.input));
        assert_eq!(data(x.target), data(y.target));
    }
}
