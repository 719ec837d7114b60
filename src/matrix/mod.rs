//! Matrix module: sparse storage for the assembled operator.

pub mod sparse;
pub use sparse::{CsrMatrix, SparseMatrix};
