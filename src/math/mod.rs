pub mod fixed;
pub mod solver;
pub mod transcendental;

pub use fixed::*;
pub use solver::*;
