use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, softmax};

use crate::ntm::addressing::HeadParams;
use crate::utils::softplus::softplus;

/// Read port into the memory.
///
/// Projects the controller's hidden state to raw control parameters and
/// maps them into their valid ranges: β via softplus, g via sigmoid, the
/// shift kernel via softmax and γ via 1 + softplus. The addressing
/// engine receives valid parameters by construction.
#[derive(Module, Debug)]
pub struct ReadHead<B: Backend> {
    /// Input channel: hidden_size.
    /// Output channel: m + shift_width + 3.
    pub proj: Linear<B>,
    pub memory_content_size: usize,
    pub shift_width: usize,
}

#[derive(Config, Debug)]
pub struct ReadHeadConfig {
    pub hidden_size: usize,
    pub memory_content_size: usize,
    #[config(default = 3)]
    pub shift_width: usize,
}

impl ReadHeadConfig {
    /// Returns the initialized head.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ReadHead<B> {
        let raw_size = self.memory_content_size + self.shift_width + 3;
        ReadHead {
            proj: LinearConfig::new(self.hidden_size, raw_size).init(device),
            memory_content_size: self.memory_content_size,
            shift_width: self.shift_width,
        }
    }
}

impl<B: Backend> ReadHead<B> {
    /// # Shapes
    ///   - hidden [batch, hidden_size]
    pub fn forward(&self, hidden: Tensor<B, 2>) -> HeadParams<B> {
        let [batch, _hidden] = hidden.dims();
        let raw = self.proj.forward(hidden);
        debug_assert_eq!(
            [batch, self.memory_content_size + self.shift_width + 3],
            raw.dims()
        );
        split_params(raw, self.memory_content_size, self.shift_width)
    }
}

/// Write port into the memory: addressing parameters plus the erase and
/// add vectors.
#[derive(Module, Debug)]
pub struct WriteHead<B: Backend> {
    /// Input channel: hidden_size.
    /// Output channel: 3 * m + shift_width + 3.
    pub proj: Linear<B>,
    pub memory_content_size: usize,
    pub shift_width: usize,
}

#[derive(Config, Debug)]
pub struct WriteHeadConfig {
    pub hidden_size: usize,
    pub memory_content_size: usize,
    #[config(default = 3)]
    pub shift_width: usize,
}

impl WriteHeadConfig {
    /// Returns the initialized head.
    pub fn init<B: Backend>(&self, device: &B::Device) -> WriteHead<B> {
        let raw_size = 3 * self.memory_content_size + self.shift_width + 3;
        WriteHead {
            proj: LinearConfig::new(self.hidden_size, raw_size).init(device),
            memory_content_size: self.memory_content_size,
            shift_width: self.shift_width,
        }
    }
}

/// Write-head parameters for one step.
#[derive(Debug, Clone)]
pub struct WriteParams<B: Backend> {
    pub addressing: HeadParams<B>,

    /// Components in [0, 1].
    ///
    /// # Shape
    /// [batch, m]
    pub erase: Tensor<B, 2>,

    /// # Shape
    /// [batch, m]
    pub add: Tensor<B, 2>,
}

impl<B: Backend> WriteHead<B> {
    /// # Shapes
    ///   - hidden [batch, hidden_size]
    pub fn forward(&self, hidden: Tensor<B, 2>) -> WriteParams<B> {
        let [batch, _hidden] = hidden.dims();
        let m = self.memory_content_size;
        let raw = self.proj.forward(hidden);
        debug_assert_eq!([batch, 3 * m + self.shift_width + 3], raw.dims());

        let mut split = raw
            .split_with_sizes(vec![m + self.shift_width + 3, m, m], 1)
            .into_iter();
        let addressing = split_params(split.next().unwrap(), m, self.shift_width);
        let erase = sigmoid(split.next().unwrap());
        let add = split.next().unwrap();

        WriteParams {
            addressing,
            erase,
            add,
        }
    }
}

/// Common key / β / g / shift / γ split and range mapping.
fn split_params<B: Backend>(raw: Tensor<B, 2>, m: usize, shift_width: usize) -> HeadParams<B> {
    let mut split = raw
        .split_with_sizes(vec![m, 1, 1, shift_width, 1], 1)
        .into_iter();

    let key = split.next().unwrap();
    let beta = softplus(split.next().unwrap());
    let gate = sigmoid(split.next().unwrap());
    let shift = softmax(split.next().unwrap(), 1);
    let gamma = softplus(split.next().unwrap()) + 1.;

    HeadParams {
        key,
        beta,
        gate,
        shift,
        gamma,
    }
}
