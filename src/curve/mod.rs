pub mod bonding_curve;
pub mod decay;
pub mod liquidity;

pub use bonding_curve::*;
pub use liquidity::*;
