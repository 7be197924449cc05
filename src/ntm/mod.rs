pub mod addressing;
pub mod controller;
pub mod heads;
pub mod memory;
mod network;
mod state;

pub use addressing::HeadParams;
pub use controller::{CellKind, Controller, ControllerCell, ControllerConfig, ControllerState};
pub use heads::{ReadHead, ReadHeadConfig, WriteHead, WriteHeadConfig, WriteParams};
pub use network::{Ntm, NtmConfig};
pub use state::NtmState;
