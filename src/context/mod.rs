//! Context module for laplace-xy linear algebra.
//!
//! This module provides context/factory types for configuring solver and preconditioner objects.
//! Contexts encapsulate algorithm selection and parameter management, and construct the
//! solver/preconditioner pipeline used by the X-Y inversion.
//!
//! Modules:
//! - [`ksp_context`]: Contains the `KspContext` struct for Krylov subspace solver configuration and dispatch.
//! - [`pc_context`]: Contains the preconditioner context type and factory.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub use ksp_context::KspContext;
pub mod pc_context;
pub use pc_context::PC;
