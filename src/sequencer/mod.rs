#[allow(clippy::module_inception)]
pub mod sequencer;
pub mod slippage;

pub use sequencer::*;
pub use slippage::*;
