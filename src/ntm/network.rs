use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use crate::error::NtmError;
use crate::ntm::addressing;
use crate::ntm::controller::{Controller, ControllerConfig};
use crate::ntm::heads::{ReadHead, ReadHeadConfig, WriteHead, WriteHeadConfig};
use crate::ntm::memory;
use crate::ntm::state::NtmState;

/// The memory interface: one recurrent controller, its read and write
/// heads, and the projection to the external output width.
#[derive(Module, Debug)]
pub struct Ntm<B: Backend> {
    pub controller: Controller<B>,
    pub read_heads: Vec<ReadHead<B>>,
    pub write_heads: Vec<WriteHead<B>>,
    /// Input channel: hidden_size + read_heads * m.
    /// Output channel: output_size.
    pub output: Linear<B>,
    pub memory_addresses: usize,
    pub memory_content_size: usize,
}

#[derive(Config, Debug)]
pub struct NtmConfig {
    /// External input width per time step.
    pub input_size: usize,

    /// External output width per time step.
    pub output_size: usize,

    pub controller: ControllerConfig,

    /// Number of memory addresses (`n`). Fixed for the lifetime of an
    /// episode.
    #[config(default = 128)]
    pub memory_addresses: usize,

    /// Content width of one address (`m`). Fixed per model instance.
    #[config(default = 20)]
    pub memory_content_size: usize,

    /// Width of the centered shift kernel; must be odd.
    #[config(default = 3)]
    pub shift_width: usize,

    #[config(default = 1)]
    pub read_heads: usize,

    #[config(default = 1)]
    pub write_heads: usize,
}

impl NtmConfig {
    /// Rejects dimension mismatches before any episode runs.
    pub fn validate(&self) -> Result<(), NtmError> {
        fn positive(value: usize, what: &str) -> Result<(), NtmError> {
            if value == 0 {
                Err(NtmError::Config(format!("{what} must be at least 1")))
            } else {
                Ok(())
            }
        }
        positive(self.input_size, "input size")?;
        positive(self.output_size, "output size")?;
        positive(self.memory_addresses, "memory address count")?;
        positive(self.memory_content_size, "memory content size")?;
        positive(self.read_heads, "read head count")?;
        positive(self.write_heads, "write head count")?;
        positive(self.controller.hidden_size, "controller hidden size")?;
        if self.shift_width % 2 == 0 {
            return Err(NtmError::Config(format!(
                "shift width {} must be odd",
                self.shift_width
            )));
        }
        if self.shift_width > self.memory_addresses {
            return Err(NtmError::Config(format!(
                "shift width {} exceeds the address count {}",
                self.shift_width, self.memory_addresses
            )));
        }
        Ok(())
    }

    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Ntm<B> {
        debug_assert!(self.validate().is_ok());
        let m = self.memory_content_size;

        let controller_input = self.input_size + self.read_heads * m;
        let controller = self.controller.init(controller_input, device);

        let read_heads = (0..self.read_heads)
            .map(|_| {
                ReadHeadConfig::new(self.controller.hidden_size, m)
                    .with_shift_width(self.shift_width)
                    .init(device)
            })
            .collect();
        let write_heads = (0..self.write_heads)
            .map(|_| {
                WriteHeadConfig::new(self.controller.hidden_size, m)
                    .with_shift_width(self.shift_width)
                    .init(device)
            })
            .collect();

        Ntm {
            controller,
            read_heads,
            write_heads,
            output: LinearConfig::new(self.controller.hidden_size + self.read_heads * m, self.output_size)
                .init(device),
            memory_addresses: self.memory_addresses,
            memory_content_size: m,
        }
    }
}

impl<B: Backend> Ntm<B> {
    /// Fresh episode state.
    ///
    /// The memory starts at a small constant (1e-6) and every attention
    /// distribution starts concentrated on address 0; both choices are
    /// deterministic so episodes are reproducible.
    pub fn init_state(&self, batch: usize, device: &B::Device) -> NtmState<B> {
        let n = self.memory_addresses;
        let m = self.memory_content_size;

        let one_hot = |heads: usize| -> Tensor<B, 3> {
            let first = Tensor::ones([batch, heads, 1], device);
            if n == 1 {
                first
            } else {
                Tensor::cat([first, Tensor::zeros([batch, heads, n - 1], device)].to_vec(), 2)
            }
        };

        NtmState {
            memory: Tensor::full([batch, n, m], 1e-6, device),
            read_weights: one_hot(self.read_heads.len()),
            write_weights: one_hot(self.write_heads.len()),
            reads: Tensor::zeros([batch, self.read_heads.len(), m], device),
            controller: self.controller.init_state(batch, device),
        }
    }

    /// One time step.
    ///
    /// The controller runs first on the input and the previous step's
    /// read vectors. Read heads then address the memory as left by the
    /// previous step; write heads mutate it afterwards as a deterministic
    /// sequential chain, each head addressing the memory left by the
    /// previous write.
    ///
    /// # Shapes
    ///   - x [batch, input_size]
    ///   - output [batch, output_size]
    pub fn step(&self, x: Tensor<B, 2>, state: NtmState<B>) -> (Tensor<B, 2>, NtmState<B>) {
        let [batch, _input] = x.dims();
        let n = self.memory_addresses;
        let m = self.memory_content_size;

        let prev_reads = state.reads.reshape([batch, self.read_heads.len() * m]);
        let (hidden, controller_state) = self.controller.step(x, prev_reads, state.controller);

        // read heads are independent within the step
        let mut read_weights = Vec::with_capacity(self.read_heads.len());
        for (i, head) in self.read_heads.iter().enumerate() {
            let params = head.forward(hidden.clone());
            let w_prev = state.read_weights.clone().narrow(1, i, 1).squeeze::<2>(1);
            let w = addressing::address(state.memory.clone(), &params, w_prev);
            debug_assert_eq!([batch, n], w.dims());
            read_weights.push(w);
        }
        let read_weights: Tensor<B, 3> = Tensor::stack(read_weights, 1);
        debug_assert_eq!([batch, self.read_heads.len(), n], read_weights.dims());

        let reads = memory::read(state.memory.clone(), read_weights.clone());
        debug_assert_eq!([batch, self.read_heads.len(), m], reads.dims());

        // write heads form a deterministic sequential chain
        let mut mem = state.memory;
        let mut write_weights = Vec::with_capacity(self.write_heads.len());
        for (i, head) in self.write_heads.iter().enumerate() {
            let params = head.forward(hidden.clone());
            let w_prev = state.write_weights.clone().narrow(1, i, 1).squeeze::<2>(1);
            let w = addressing::address(mem.clone(), &params.addressing, w_prev);
            mem = memory::write(mem, w.clone(), params.erase, params.add);
            write_weights.push(w);
        }
        let write_weights: Tensor<B, 3> = Tensor::stack(write_weights, 1);

        let read_flat = reads.clone().reshape([batch, self.read_heads.len() * m]);
        let y = self
            .output
            .forward(Tensor::cat([hidden, read_flat].to_vec(), 1));

        let state = NtmState {
            memory: mem,
            read_weights,
            write_weights,
            reads,
            controller: controller_state,
        };
        (y, state)
    }

    /// Runs the whole sequence, collecting the per-step outputs.
    ///
    /// # Shapes
    ///   - input [batch, sequence, input_size]
    ///   - output [batch, sequence, output_size]
    pub fn forward(&self, input: Tensor<B, 3>, state: NtmState<B>) -> (Tensor<B, 3>, NtmState<B>) {
        let [_batch, sequence, _input_size] = input.dims();

        let mut state = state;
        let mut outputs = Vec::with_capacity(sequence);
        for t in 0..sequence {
            let x = input.clone().narrow(1, t, 1).squeeze::<2>(1);
            let (y, next) = self.step(x, state);
            outputs.push(y);
            state = next;
        }

        let output: Tensor<B, 3> = Tensor::stack(outputs, 1);
        debug_assert_eq!(sequence, output.dims()[1]);
        (output, state)
    }
}
