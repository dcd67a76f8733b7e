pub mod shared;
pub mod store;

pub use shared::*;
pub use store::*;
