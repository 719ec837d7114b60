//! Core traits and their implementations for vectors, Faer matrices and
//! distributed reductions.

pub mod traits;
pub mod wrappers;

pub use traits::{InnerProduct, MatVec};
pub use wrappers::DistributedInnerProduct;
