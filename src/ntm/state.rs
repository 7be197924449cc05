use burn::prelude::*;

use crate::ntm::controller::ControllerState;

/// Full mutable state of one in-flight episode: the Memory Bank, every
/// head's attention distribution, the read vectors fed back to the
/// controller and the controller's recurrent state.
///
/// Passed into and returned from every time-step call; the interface
/// rebuilds it at episode start, so nothing leaks across episodes and a
/// single step can be tested in isolation.
#[derive(Debug, Clone)]
pub struct NtmState<B: Backend> {
    /// # Shape
    /// [batch, n, m]
    pub memory: Tensor<B, 3>,

    /// One simplex row per read head.
    ///
    /// # Shape
    /// [batch, read_heads, n]
    pub read_weights: Tensor<B, 3>,

    /// One simplex row per write head.
    ///
    /// # Shape
    /// [batch, write_heads, n]
    pub write_weights: Tensor<B, 3>,

    /// Read vectors from the previous step.
    ///
    /// # Shape
    /// [batch, read_heads, m]
    pub reads: Tensor<B, 3>,

    pub controller: ControllerState<B>,
}
