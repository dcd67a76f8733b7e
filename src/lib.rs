#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(unused_must_use)]
pub mod curve;
pub mod math;
pub mod sequencer;
pub mod sync;
pub mod types;
pub mod utils;
