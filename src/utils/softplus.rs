use burn::prelude::*;
use burn::tensor::{DType, Element};

/// Applies the SoftPlus function element-wise.
///
/// `softplus(x) = log(e^x + 1)`, strictly positive for finite inputs.
/// The f16 path uses the overflow-safe `max(x, 0) + log(e^-|x| + 1)`
/// form.
pub fn softplus<const D: usize, B: Backend>(x: Tensor<B, D>) -> Tensor<B, D> {
    match <B::FloatElem as Element>::dtype() {
        DType::F16 => {
            // max(a, 0) = (a + |a|) / 2
            let xabs = x.clone().abs();
            (x + xabs.clone()) / 2. + xabs.neg().exp().log1p()
        }
        _ => x.exp().log1p(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TB = burn::backend::NdArray<f32>;

    #[test]
    fn is_positive_and_matches_the_reference_values() {
        let device = Default::default();
        let x = Tensor::<TB, 1>::from_floats([-4.0, 0.0, 2.5], &device);
        let y = softplus(x).into_data().to_vec::<f32>().unwrap();

        let expected = [0.018150, 0.693147, 2.578893f32];
        for (got, want) in y.iter().zip(expected) {
            assert!(*got > 0.0);
            assert!((got - want).abs() < 1e-4, "{got} != {want}");
        }
    }
}
