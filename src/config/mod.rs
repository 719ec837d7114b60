//! Configuration: the nested option tree and the typed solver settings
//! read from it.

pub mod laplacexy;
pub mod options;

pub use laplacexy::{DirichletBoundaries, FaceAveraging, KspType, LaplaceXyConfig, PcSide, PcType};
pub use options::Options;
