pub mod common;
pub mod error;
pub mod event;
pub mod pool_state;
pub mod receipt;
pub mod snapshot;

pub use common::*;
pub use error::*;
pub use event::*;
pub use pool_state::*;
pub use receipt::*;
pub use snapshot::*;
