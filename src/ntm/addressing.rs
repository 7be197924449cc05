use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::ntm::memory;

/// Post-processed control parameters driving one head for one step.
///
/// Produced exclusively by the head projections (see [`crate::ntm::heads`]),
/// which guarantee the documented ranges. The addressing engine relies
/// on them and never clamps; a violation is a contract defect of the
/// producer.
#[derive(Debug, Clone)]
pub struct HeadParams<B: Backend> {
    /// Content lookup key.
    ///
    /// # Shape
    /// [batch, m]
    pub key: Tensor<B, 2>,

    /// Key strength, > 0.
    ///
    /// # Shape
    /// [batch, 1]
    pub beta: Tensor<B, 2>,

    /// Interpolation gate in [0, 1].
    ///
    /// # Shape
    /// [batch, 1]
    pub gate: Tensor<B, 2>,

    /// Simplex over the centered shift offsets.
    ///
    /// # Shape
    /// [batch, shift_width]
    pub shift: Tensor<B, 2>,

    /// Sharpening exponent, >= 1.
    ///
    /// # Shape
    /// [batch, 1]
    pub gamma: Tensor<B, 2>,
}

/// One full addressing pass: content, interpolation, shift, sharpening.
///
/// For any valid parameters the output rows are non-negative and sum
/// to 1.
///
/// # Shapes
///   - memory [batch, n, m]
///   - w_prev [batch, n]
///   - output [batch, n]
pub fn address<B: Backend>(
    memory: Tensor<B, 3>,
    params: &HeadParams<B>,
    w_prev: Tensor<B, 2>,
) -> Tensor<B, 2> {
    let [batch, n, _m] = memory.dims();
    debug_assert_eq!([batch, n], w_prev.dims());

    let w_c = content_addressing(memory, params.key.clone(), params.beta.clone());
    let w_g = interpolate(w_c, w_prev, params.gate.clone());
    let w_s = circular_shift(w_g, params.shift.clone());
    sharpen(w_s, params.gamma.clone())
}

/// Similarity-driven attention over all addresses.
///
/// # Shapes
///   - memory [batch, n, m]
///   - key [batch, m]
///   - beta [batch, 1]
///   - output [batch, n]
pub fn content_addressing<B: Backend>(
    memory: Tensor<B, 3>,
    key: Tensor<B, 2>,
    beta: Tensor<B, 2>,
) -> Tensor<B, 2> {
    let [batch, n, _m] = memory.dims();
    let sim = memory::content_similarity(memory, key);
    debug_assert_eq!([batch, n], sim.dims());
    softmax(sim * beta, 1)
}

/// `w_g = g * w_c + (1 - g) * w_prev`
///
/// At the first step of an episode `w_prev` is the deterministic initial
/// distribution set by the interface (one-hot on address 0).
pub fn interpolate<B: Backend>(
    w_c: Tensor<B, 2>,
    w_prev: Tensor<B, 2>,
    gate: Tensor<B, 2>,
) -> Tensor<B, 2> {
    w_c * gate.clone() + w_prev * (gate.neg() + 1.)
}

/// Circular convolution of the attention with the shift kernel.
///
/// Offsets span `-(width / 2) ..= width / 2`; a kernel concentrated on
/// offset +1 moves attention to the next-higher address, wrapping across
/// the address space.
///
/// # Shapes
///   - w [batch, n]
///   - shift [batch, width], width odd
///   - output [batch, n]
pub fn circular_shift<B: Backend>(w: Tensor<B, 2>, shift: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, n] = w.dims();
    let [_batch, width] = shift.dims();
    debug_assert_eq!(1, width % 2);

    let half = (width / 2) as i64;
    let mut out = Tensor::zeros([batch, n], &w.device());
    for (i, offset) in (-half..=half).enumerate() {
        let rolled = roll(w.clone(), offset);
        out = out + rolled * shift.clone().narrow(1, i, 1);
    }
    out
}

/// Rotates each row so that `out[i] = w[(i - offset) mod n]`.
fn roll<B: Backend>(w: Tensor<B, 2>, offset: i64) -> Tensor<B, 2> {
    let [_batch, n] = w.dims();
    let k = offset.rem_euclid(n as i64) as usize;
    if k == 0 {
        return w;
    }
    let head = w.clone().narrow(1, n - k, k);
    let tail = w.narrow(1, 0, n - k);
    Tensor::cat([head, tail].to_vec(), 1)
}

/// `w[i] = w_s[i]^γ / Σ_j w_s[j]^γ`
///
/// # Shapes
///   - w_s [batch, n]
///   - gamma [batch, 1]
///   - output [batch, n]
pub fn sharpen<B: Backend>(w_s: Tensor<B, 2>, gamma: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, n] = w_s.dims();
    debug_assert_eq!([batch, 1], gamma.dims());

    let powered = w_s.powf(gamma.expand([batch, n]));
    let total = powered.clone().sum_dim(1);
    debug_assert_eq!([batch, 1], total.dims());
    powered / total
}

#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray<f32>;

    fn data<const D: usize>(t: Tensor<TB, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn assert_simplex(row: &[f32]) {
        let sum: f32 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "sum {sum} != 1");
        assert!(row.iter().all(|w| *w >= 0.0), "negative weight in {row:?}");
    }

    fn params(
        key: [f32; 3],
        beta: f32,
        gate: f32,
        shift: [f32; 3],
        gamma: f32,
    ) -> HeadParams<TB> {
        let device = Default::default();
        HeadParams {
            key: Tensor::from_floats([key], &device),
            beta: Tensor::from_floats([[beta]], &device),
            gate: Tensor::from_floats([[gate]], &device),
            shift: Tensor::from_floats([shift], &device),
            gamma: Tensor::from_floats([[gamma]], &device),
        }
    }

    fn memory_5x3() -> Tensor<TB, 3> {
        Tensor::from_floats(
            [[
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 1.0],
            ]],
            &Default::default(),
        )
    }

    #[test]
    fn output_is_always_a_distribution() {
        let device = Default::default();
        let w_prev = Tensor::<TB, 2>::from_floats([[0.1, 0.3, 0.2, 0.15, 0.25]], &device);

        for (beta, gate, gamma) in [(0.5, 0.0, 1.0), (3.0, 0.4, 2.5), (50.0, 1.0, 8.0)] {
            let p = params([0.2, -0.7, 0.5], beta, gate, [0.1, 0.6, 0.3], gamma);
            let w = address(memory_5x3(), &p, w_prev.clone());
            assert_simplex(&data(w));
        }
    }

    #[test]
    fn a_strong_key_concentrates_on_the_matching_address() {
        let device = Default::default();
        let w_prev = Tensor::<TB, 2>::from_floats([[0.2, 0.2, 0.2, 0.2, 0.2]], &device);
        // key equals row 2, near-deterministic content addressing
        let p = params([0.0, 0.0, 1.0], 100.0, 1.0, [0.0, 1.0, 0.0], 1.0);

        let w = data(address(memory_5x3(), &p, w_prev));
        assert!(w[2] > 0.99, "weight at address 2 is {}", w[2]);
        for (i, weight) in w.iter().enumerate() {
            if i != 2 {
                assert!(*weight < 0.01, "weight at address {i} is {weight}");
            }
        }
    }

    #[test]
    fn shift_rotates_the_attention_circularly() {
        let device = Default::default();
        let w = Tensor::<TB, 2>::from_floats([[0.0, 1.0, 0.0, 0.0]], &device);

        let forward = Tensor::<TB, 2>::from_floats([[0.0, 0.0, 1.0]], &device);
        assert_eq!(vec![0.0, 0.0, 1.0, 0.0], data(circular_shift(w.clone(), forward)));

        let backward = Tensor::<TB, 2>::from_floats([[1.0, 0.0, 0.0]], &device);
        assert_eq!(vec![1.0, 0.0, 0.0, 0.0], data(circular_shift(w.clone(), backward)));

        // wrap-around at the boundary
        let last = Tensor::<TB, 2>::from_floats([[0.0, 0.0, 0.0, 1.0]], &device);
        let shifted = Tensor::<TB, 2>::from_floats([[0.0, 0.0, 1.0]], &device);
        assert_eq!(vec![1.0, 0.0, 0.0, 0.0], data(circular_shift(last, shifted)));
    }

    #[test]
    fn sharpening_with_unit_gamma_is_the_identity() {
        let device = Default::default();
        let w = Tensor::<TB, 2>::from_floats([[0.1, 0.2, 0.3, 0.4]], &device);
        let gamma = Tensor::<TB, 2>::from_floats([[1.0]], &device);

        let out = data(sharpen(w.clone(), gamma));
        for (got, want) in out.iter().zip(data(w)) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn sharpening_reduces_blur() {
        let device = Default::default();
        let w = Tensor::<TB, 2>::from_floats([[0.1, 0.2, 0.3, 0.4]], &device);
        let gamma = Tensor::<TB, 2>::from_floats([[3.0]], &device);

        let out = data(sharpen(w, gamma));
        assert_simplex(&out);
        assert!(out[3] > 0.4);
        assert!(out[0] < 0.1);
    }
}
