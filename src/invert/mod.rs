//! Elliptic inversions.

pub mod laplacexy;

pub use laplacexy::{LaplaceXY, LaplaceXYSolver, UnavailableLaplaceXY};
