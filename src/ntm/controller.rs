use burn::nn::gru::{Gru, GruConfig};
use burn::nn::{Lstm, LstmConfig, LstmState};
use burn::prelude::*;

/// Recurrent cell variants; callers depend only on the step contract,
/// never on a cell's internals.
#[derive(Config, Debug, PartialEq)]
pub enum CellKind {
    Lstm,
    Gru,
}

#[derive(Config, Debug)]
pub struct ControllerConfig {
    /// Width of the recurrent hidden state.
    pub hidden_size: usize,

    #[config(default = "CellKind::Lstm")]
    pub cell: CellKind,
}

impl ControllerConfig {
    /// Returns the initialized controller.
    ///
    /// `input_size` is the external input width plus the concatenated
    /// read vectors fed back from the previous step.
    pub fn init<B: Backend>(&self, input_size: usize, device: &B::Device) -> Controller<B> {
        let cell = match self.cell {
            CellKind::Lstm => {
                ControllerCell::Lstm(LstmConfig::new(input_size, self.hidden_size, true).init(device))
            }
            CellKind::Gru => {
                ControllerCell::Gru(GruConfig::new(input_size, self.hidden_size, true).init(device))
            }
        };
        Controller {
            cell,
            hidden_size: self.hidden_size,
        }
    }
}

#[derive(Module, Debug)]
pub enum ControllerCell<B: Backend> {
    Lstm(Lstm<B>),
    Gru(Gru<B>),
}

#[derive(Module, Debug)]
pub struct Controller<B: Backend> {
    pub cell: ControllerCell<B>,
    pub hidden_size: usize,
}

/// Recurrent state threaded across the steps of one episode.
#[derive(Debug, Clone)]
pub enum ControllerState<B: Backend> {
    Lstm {
        /// # Shape
        /// [batch, hidden_size]
        cell: Tensor<B, 2>,
        /// # Shape
        /// [batch, hidden_size]
        hidden: Tensor<B, 2>,
    },
    Gru {
        /// # Shape
        /// [batch, hidden_size]
        hidden: Tensor<B, 2>,
    },
}

impl<B: Backend> Controller<B> {
    /// Fresh zeroed recurrent state, used at episode start.
    pub fn init_state(&self, batch: usize, device: &B::Device) -> ControllerState<B> {
        let zeros = || Tensor::zeros([batch, self.hidden_size], device);
        match self.cell {
            ControllerCell::Lstm(_) => ControllerState::Lstm {
                cell: zeros(),
                hidden: zeros(),
            },
            ControllerCell::Gru(_) => ControllerState::Gru { hidden: zeros() },
        }
    }

    /// One recurrent step.
    ///
    /// # Shapes
    ///   - x [batch, input_size]
    ///   - reads [batch, read_heads * m]
    ///   - output [batch, hidden_size]
    pub fn step(
        &self,
        x: Tensor<B, 2>,
        reads: Tensor<B, 2>,
        state: ControllerState<B>,
    ) -> (Tensor<B, 2>, ControllerState<B>) {
        let [batch, _input] = x.dims();
        let input: Tensor<B, 3> = Tensor::cat([x, reads].to_vec(), 1).unsqueeze_dim(1);
        debug_assert_eq!(1, input.dims()[1]);

        match (&self.cell, state) {
            (ControllerCell::Lstm(lstm), ControllerState::Lstm { cell, hidden }) => {
                let (out, next) = lstm.forward(input, Some(LstmState::new(cell, hidden)));
                let out = out.squeeze::<2>(1);
                debug_assert_eq!([batch, self.hidden_size], out.dims());
                (
                    out,
                    ControllerState::Lstm {
                        cell: next.cell,
                        hidden: next.hidden,
                    },
                )
            }
            (ControllerCell::Gru(gru), ControllerState::Gru { hidden }) => {
                let out = gru.forward(input, Some(hidden));
                let out = out.squeeze::<2>(1);
                debug_assert_eq!([batch, self.hidden_size], out.dims());
                let next = ControllerState::Gru {
                    hidden: out.clone(),
                };
                (out, next)
            }
            _ => unreachable!("controller state does not match the cell variant"),
        }
    }
}
