//! Training core for memory-augmented sequence models: a Neural Turing
//! Machine memory interface with curriculum-driven episode training.

pub mod context;
pub mod curriculum;
pub mod error;
pub mod ntm;
pub mod problem;
pub mod registry;
pub mod train;
pub mod utils;

pub mod prelude {
    pub use crate::context::RunContext;
    pub use crate::curriculum::{Curriculum, CurriculumConfig};
    pub use crate::error::NtmError;
    pub use crate::ntm::*;
    pub use crate::problem::{Problem, SequenceBatch, SerialRecall, SerialRecallConfig};
    pub use crate::registry::{Registry, cell_registry, problem_registry};
    pub use crate::train::{
        StopReason, Termination, TrainOutcome, TrainSummary, TrainingConfig, train,
    };
    pub use crate::utils::loss::{LossKind, MaskedLoss, MaskedReduction};
}
