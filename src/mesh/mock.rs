//! Minimal in-memory mesh: a rectangle with one X guard layer, optional Y
//! guards, and an X-split variant whose ranks run as threads.

use super::{CellLoc, Coordinates, Field2D, Mesh};
use crate::parallel::{Comm, SerialComm, ThreadComm};

/// Communicators able to swap guard strips between X neighbours.
pub trait GuardExchange: Comm {
    /// Every rank's `strip`, indexed by rank. Collective.
    fn exchange_strips(&self, strip: &[f64]) -> Vec<Vec<f64>>;
}

impl GuardExchange for SerialComm {
    fn exchange_strips(&self, strip: &[f64]) -> Vec<Vec<f64>> {
        vec![strip.to_vec()]
    }
}

impl GuardExchange for ThreadComm {
    fn exchange_strips(&self, strip: &[f64]) -> Vec<Vec<f64>> {
        self.all_gather_f64(strip)
    }
}

#[derive(Debug, Clone)]
pub struct MockMesh<C = SerialComm> {
    nx: usize,
    ny: usize,
    mxg: usize,
    myg: usize,
    x_offset: usize,
    y_offset: usize,
    first_x: bool,
    last_x: bool,
    periodic_y: bool,
    coords: Coordinates,
    comm: C,
}

impl MockMesh<SerialComm> {
    /// `nx × ny` points (guards included) on one process, one X guard layer,
    /// no Y guards, unit Cartesian metric.
    pub fn new(nx: usize, ny: usize) -> Self {
        Self::with_comm(nx, ny, SerialComm::new())
    }
}

impl MockMesh<ThreadComm> {
    /// Splits `global_nx` X points (both guard layers included) over
    /// `nprocs` thread ranks. Interior columns are dealt out as evenly as
    /// possible, earlier ranks taking the remainder.
    pub fn split_x(global_nx: usize, ny: usize, nprocs: usize) -> Vec<MockMesh<ThreadComm>> {
        let mxg = 1;
        let interior = global_nx.saturating_sub(2 * mxg);
        let comms = ThreadComm::universe(nprocs);
        let n = comms.len();
        let mut offset = 0;
        comms
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                let count = interior / n + usize::from(rank < interior % n);
                let mut mesh = MockMesh::with_comm(count + 2 * mxg, ny, comm);
                mesh.x_offset = offset;
                mesh.first_x = rank == 0;
                mesh.last_x = rank + 1 == n;
                offset += count;
                mesh
            })
            .collect()
    }
}

impl<C: GuardExchange> MockMesh<C> {
    pub fn with_comm(nx: usize, ny: usize, comm: C) -> Self {
        Self {
            nx,
            ny,
            mxg: 1,
            myg: 0,
            x_offset: 0,
            y_offset: 0,
            first_x: true,
            last_x: true,
            periodic_y: false,
            coords: Coordinates::uniform(nx, ny, 1.0, 1.0),
            comm,
        }
    }

    /// Number of Y guard layers at each end (`ny` is unchanged).
    pub fn with_y_guards(mut self, myg: usize) -> Self {
        self.myg = myg;
        self
    }

    pub fn with_periodic_y(mut self, periodic: bool) -> Self {
        self.periodic_y = periodic;
        self
    }

    pub fn with_coordinates(mut self, coords: Coordinates) -> Self {
        self.coords = coords;
        self
    }

    pub fn with_offsets(mut self, x_offset: usize, y_offset: usize) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    /// Field of this mesh's shape filled from global (guard-inclusive)
    /// indices, so every rank of a split sees the same function.
    pub fn global_field(&self, f: impl Fn(usize, usize) -> f64) -> Field2D {
        Field2D::from_fn(self.nx, self.ny, |x, y| f(self.x_offset + x, self.y_offset + y))
    }

    fn wrap_y(&self, f: &mut Field2D) {
        if !self.periodic_y || self.myg == 0 || self.ny < 2 * self.myg + 1 {
            return;
        }
        let (ys, ye) = (self.ystart(), self.yend());
        for x in 0..self.nx {
            for g in 0..self.myg {
                let v = f[(x, ye - g)];
                f[(x, ys - 1 - g)] = v;
                let v = f[(x, ys + g)];
                f[(x, ye + 1 + g)] = v;
            }
        }
    }

    fn strip(&self, f: &Field2D, x0: usize) -> Vec<f64> {
        (x0..x0 + self.mxg)
            .flat_map(|x| (0..self.ny).map(move |y| (x, y)))
            .map(|p| f[p])
            .collect()
    }
}

impl<C: GuardExchange> Mesh for MockMesh<C> {
    type Comm = C;

    fn local_nx(&self) -> usize {
        self.nx
    }
    fn local_ny(&self) -> usize {
        self.ny
    }
    fn xstart(&self) -> usize {
        self.mxg
    }
    fn xend(&self) -> usize {
        // An empty interior shows up as xend < xstart.
        self.nx.saturating_sub(self.mxg + 1)
    }
    fn ystart(&self) -> usize {
        self.myg
    }
    fn yend(&self) -> usize {
        self.ny.saturating_sub(self.myg + 1)
    }
    fn global_x_offset(&self) -> usize {
        self.x_offset
    }
    fn global_y_offset(&self) -> usize {
        self.y_offset
    }
    fn first_x(&self) -> bool {
        self.first_x
    }
    fn last_x(&self) -> bool {
        self.last_x
    }
    fn lower_y_boundary(&self, _x: usize) -> bool {
        !self.periodic_y
    }
    fn upper_y_boundary(&self, _x: usize) -> bool {
        !self.periodic_y
    }
    fn periodic_y(&self, _x: usize) -> bool {
        self.periodic_y
    }
    fn xy_comm(&self) -> &C {
        &self.comm
    }
    fn coordinates(&self, _loc: CellLoc) -> Option<&Coordinates> {
        Some(&self.coords)
    }

    fn communicate(&self, f: &mut Field2D) {
        let usable = f.is_allocated() && f.nx() == self.nx && f.ny() == self.ny;
        if usable {
            self.wrap_y(f);
        }
        if self.comm.size() == 1 {
            return;
        }
        // Left interior strip, then right interior strip.
        let mut send = Vec::new();
        if usable && self.nx >= 2 * self.mxg {
            send.extend(self.strip(f, self.xstart()));
            send.extend(self.strip(f, self.nx - 2 * self.mxg));
        }
        let all = self.comm.exchange_strips(&send);
        if send.is_empty() {
            return;
        }
        let width = self.mxg * self.ny;
        let rank = self.comm.rank();
        if !self.first_x && rank > 0 {
            if let Some(left) = all.get(rank - 1).filter(|s| s.len() == 2 * width) {
                for (k, &v) in left[width..].iter().enumerate() {
                    f[(k / self.ny, k % self.ny)] = v;
                }
            }
        }
        if !self.last_x {
            if let Some(right) = all.get(rank + 1).filter(|s| s.len() == 2 * width) {
                let x0 = self.nx - self.mxg;
                for (k, &v) in right[..width].iter().enumerate() {
                    f[(x0 + k / self.ny, k % self.ny)] = v;
                }
            }
        }
    }
}
