use burn::prelude::*;

use crate::utils::div_eps;

/// Weighted read over all addresses.
///
/// Pure projection; multiple read heads may share one memory within a
/// step without ordering constraints.
///
/// # Shapes
///   - memory [batch, n, m]
///   - weights [batch, heads, n]
///   - output [batch, heads, m]
pub fn read<B: Backend>(memory: Tensor<B, 3>, weights: Tensor<B, 3>) -> Tensor<B, 3> {
    let [batch, _n, m] = memory.dims();
    let [_batch, heads, _n] = weights.dims();

    let out = weights.matmul(memory);
    debug_assert_eq!([batch, heads, m], out.dims());
    out
}

/// Erase-then-add write of a single head:
///
/// `memory[i] = memory[i] * (1 - w[i] * erase) + w[i] * add`
///
/// Multiple write heads must be applied as a sequential chain, each head
/// observing the memory left by the previous one.
///
/// # Shapes
///   - memory [batch, n, m]
///   - weights [batch, n]
///   - erase [batch, m], components in [0, 1]
///   - add [batch, m]
///   - output [batch, n, m]
pub fn write<B: Backend>(
    memory: Tensor<B, 3>,
    weights: Tensor<B, 2>,
    erase: Tensor<B, 2>,
    add: Tensor<B, 2>,
) -> Tensor<B, 3> {
    let [batch, n, m] = memory.dims();
    debug_assert_eq!([batch, n], weights.dims());
    debug_assert_eq!([batch, m], erase.dims());
    debug_assert_eq!([batch, m], add.dims());

    let weights: Tensor<B, 3> = weights.unsqueeze_dim(2);
    debug_assert_eq!([batch, n, 1], weights.dims());
    let erase: Tensor<B, 3> = erase.unsqueeze_dim(1);
    debug_assert_eq!([batch, 1, m], erase.dims());
    let add: Tensor<B, 3> = add.unsqueeze_dim(1);

    let erased = memory * ((weights.clone() * erase).neg() + 1.);
    erased + weights * add
}

/// Cosine similarity between a key and every address row.
///
/// The denominator carries a division epsilon, so an all-zero row
/// scores 0 instead of NaN.
///
/// # Shapes
///   - memory [batch, n, m]
///   - key [batch, m]
///   - output [batch, n]
pub fn content_similarity<B: Backend>(memory: Tensor<B, 3>, key: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, n, m] = memory.dims();
    debug_assert_eq!([batch, m], key.dims());

    let key: Tensor<B, 3> = key.unsqueeze_dim(2);
    debug_assert_eq!([batch, m, 1], key.dims());

    let dot = memory.clone().matmul(key.clone());
    debug_assert_eq!([batch, n, 1], dot.dims());

    let memory_norm = memory.powi_scalar(2).sum_dim(2).sqrt();
    debug_assert_eq!([batch, n, 1], memory_norm.dims());
    let key_norm = key.powi_scalar(2).sum_dim(1).sqrt();
    debug_assert_eq!([batch, 1, 1], key_norm.dims());

    let sim = dot / (memory_norm * key_norm + div_eps::<B>());
    sim.squeeze(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray<f32>;

    fn data<const D: usize>(t: Tensor<TB, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn write_then_read_round_trips_with_full_erase() {
        let device = Default::default();
        let memory = Tensor::<TB, 3>::from_floats(
            [[
                [0.3, 0.1, 0.7],
                [0.9, 0.2, 0.4],
                [0.5, 0.5, 0.5],
                [0.0, 0.8, 0.1],
                [0.6, 0.3, 0.9],
            ]],
            &device,
        );
        let weights = Tensor::<TB, 2>::from_floats([[0.0, 0.0, 1.0, 0.0, 0.0]], &device);
        let erase = Tensor::<TB, 2>::from_floats([[1.0, 1.0, 1.0]], &device);
        let add = Tensor::<TB, 2>::from_floats([[0.25, -0.5, 2.0]], &device);

        let memory = write(memory, weights.clone(), erase, add);
        let read_back = read(memory, weights.unsqueeze_dim(1)).squeeze::<2>(1);

        let got = data(read_back);
        for (got, want) in got.iter().zip([0.25, -0.5, 2.0f32]) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
    }

    #[test]
    fn a_no_op_write_leaves_memory_unchanged() {
        let device = Default::default();
        let memory = Tensor::<TB, 3>::from_floats(
            [[[0.3, 0.1], [0.9, 0.2], [0.5, 0.5]]],
            &device,
        );
        let weights = Tensor::<TB, 2>::from_floats([[0.2, 0.5, 0.3]], &device);
        let erase = Tensor::<TB, 2>::zeros([1, 2], &device);
        let add = Tensor::<TB, 2>::zeros([1, 2], &device);

        let before = data(memory.clone());
        let after = data(write(memory, weights, erase, add));
        assert_eq!(before, after);
    }

    #[test]
    fn an_all_zero_row_scores_zero_similarity() {
        let device = Default::default();
        let memory = Tensor::<TB, 3>::from_floats(
            [[[1.0, 0.0], [0.0, 0.0], [0.0, 1.0]]],
            &device,
        );
        let key = Tensor::<TB, 2>::from_floats([[1.0, 0.0]], &device);

        let sim = data(content_similarity(memory, key));
        assert!((sim[0] - 1.0).abs() < 1e-4);
        assert_eq!(0.0, sim[1]);
        assert!(sim[2].abs() < 1e-6);
    }
}
