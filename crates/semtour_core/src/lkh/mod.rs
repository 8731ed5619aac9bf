//! Route optimizer that shells out to LKH.

mod optimizer;
mod params;
mod process;
mod tsplib;

pub use optimizer::LkhOptimizer;
