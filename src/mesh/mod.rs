//! The grid descriptor the solver consumes.
//!
//! A [`Mesh`] describes one process's rectangle of the X-Y plane: its local
//! extents including guard cells, which part is interior, where that interior
//! sits globally, which edges are physical boundaries, and how to refresh
//! guard cells from neighbouring processes.

pub mod coordinates;
pub mod field;
pub mod mock;

pub use coordinates::Coordinates;
pub use field::{CellLoc, Field2D};
pub use mock::{GuardExchange, MockMesh};

use crate::parallel::Comm;

pub trait Mesh {
    type Comm: Comm;

    /// Local points in X, guard cells included.
    fn local_nx(&self) -> usize;
    /// Local points in Y, guard cells included.
    fn local_ny(&self) -> usize;
    /// First interior X index (inclusive).
    fn xstart(&self) -> usize;
    /// Last interior X index (inclusive).
    fn xend(&self) -> usize;
    fn ystart(&self) -> usize;
    fn yend(&self) -> usize;
    /// Global index of local `xstart` among all interior X points.
    fn global_x_offset(&self) -> usize;
    fn global_y_offset(&self) -> usize;
    /// This process touches the inner X boundary.
    fn first_x(&self) -> bool;
    /// This process touches the outer X boundary.
    fn last_x(&self) -> bool;
    /// Column `x` ends at a non-periodic physical boundary below `ystart`.
    fn lower_y_boundary(&self, x: usize) -> bool;
    /// Column `x` ends at a non-periodic physical boundary above `yend`.
    fn upper_y_boundary(&self, x: usize) -> bool;
    fn periodic_y(&self, x: usize) -> bool;
    /// Communicator spanning exactly the processes of this X-Y plane.
    fn xy_comm(&self) -> &Self::Comm;
    fn coordinates(&self, loc: CellLoc) -> Option<&Coordinates>;
    /// Fill guard cells from neighbouring processes (and periodic images).
    /// Collective over `xy_comm`.
    fn communicate(&self, f: &mut Field2D);
}
