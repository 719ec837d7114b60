//! Global numbering of the rows of the X-Y system.
//!
//! Every process numbers its own rows contiguously, x-major, starting at the
//! sum of the row counts of lower ranks. Rows are the interior points plus
//! one boundary layer on each physical boundary; corners carry no row. The
//! numbering is written into a field and guard-exchanged, so each process
//! also learns the global index of every neighbour its stencils touch.

use std::collections::HashMap;

use crate::error::KError;
use crate::mesh::{Field2D, Mesh};
use crate::parallel::Comm;

/// What equation a row carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RowKind {
    Interior,
    InnerX,
    OuterX,
    LowerY,
    UpperY,
}

impl RowKind {
    pub fn is_boundary(self) -> bool {
        self != RowKind::Interior
    }
}

/// A locally owned row and the cell it lives on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub x: usize,
    pub y: usize,
    pub kind: RowKind,
}

#[derive(Debug, Clone)]
pub struct IndexMapper {
    nx: usize,
    ny: usize,
    rows: Vec<Row>,
    /// Local column of each cell (x-major); owned columns equal row numbers,
    /// ghost columns follow them.
    columns: Vec<Option<usize>>,
    /// Cell holding the value of ghost column `n_local + k`.
    ghosts: Vec<(usize, usize)>,
    /// Global index of each ghost column.
    ghost_globals: Vec<usize>,
    offset: usize,
    n_global: usize,
    /// Local rows grouped by Y index, x-ascending within a group.
    lines: Vec<Vec<usize>>,
    /// First and last owned X column.
    x_range: (usize, usize),
    /// Owned Y range of each X column, where it has rows.
    y_ranges: Vec<Option<(usize, usize)>>,
}

fn classify<G: Mesh>(mesh: &G, x: usize, y: usize, include_y: bool) -> Option<RowKind> {
    let (xs, xe, ys, ye) = (mesh.xstart(), mesh.xend(), mesh.ystart(), mesh.yend());
    let in_x = (xs..=xe).contains(&x);
    let in_y = (ys..=ye).contains(&y);
    if in_x && in_y {
        Some(RowKind::Interior)
    } else if in_y && x + 1 == xs && mesh.first_x() {
        Some(RowKind::InnerX)
    } else if in_y && x == xe + 1 && mesh.last_x() {
        Some(RowKind::OuterX)
    } else if in_x && include_y && !mesh.periodic_y(x) && y + 1 == ys && mesh.lower_y_boundary(x) {
        Some(RowKind::LowerY)
    } else if in_x && include_y && !mesh.periodic_y(x) && y == ye + 1 && mesh.upper_y_boundary(x) {
        Some(RowKind::UpperY)
    } else {
        None
    }
}

/// Local reasons the mesh cannot carry the stencil, if any.
fn check_extents<G: Mesh>(mesh: &G, include_y: bool) -> Option<String> {
    let (nx, ny) = (mesh.local_nx(), mesh.local_ny());
    let (xs, xe, ys, ye) = (mesh.xstart(), mesh.xend(), mesh.ystart(), mesh.yend());
    if xe < xs || ye < ys || xe >= nx || ye >= ny {
        return Some(format!(
            "empty or out-of-range interior x {xs}..={xe}, y {ys}..={ye} on a {nx}x{ny} mesh"
        ));
    }
    if xs == 0 || xe + 1 >= nx {
        return Some("the X stencil needs one guard column on each side".into());
    }
    if include_y && (ys == 0 || ye + 1 >= ny) {
        return Some("include_y_derivs needs one guard row at each Y end".into());
    }
    None
}

impl IndexMapper {
    /// Number the rows of `mesh`. Collective over the plane communicator.
    ///
    /// Fails (on every process alike) when some process's mesh lacks the
    /// guard cells the stencil reads, or when interior rectangles of two
    /// processes overlap.
    pub fn build<G: Mesh>(mesh: &G, include_y: bool) -> Result<Self, KError> {
        let comm = mesh.xy_comm();
        let problem = check_extents(mesh, include_y);
        if comm.any(problem.is_some()) {
            return Err(KError::config(
                problem.unwrap_or_else(|| "mesh rejected on another process".into()),
            ));
        }

        let (xs, xe, ys, ye) = (mesh.xstart(), mesh.xend(), mesh.ystart(), mesh.yend());
        let rect = [
            mesh.global_x_offset(),
            xe - xs + 1,
            mesh.global_y_offset(),
            ye - ys + 1,
        ];
        let rects = comm.all_gather_usize(&rect);
        let rects: Vec<&[usize]> = rects.chunks(4).collect();
        for (p, a) in rects.iter().enumerate() {
            for (q, b) in rects.iter().enumerate().skip(p + 1) {
                let x_overlap = a[0] < b[0] + b[1] && b[0] < a[0] + a[1];
                let y_overlap = a[2] < b[2] + b[3] && b[2] < a[2] + a[3];
                if x_overlap && y_overlap {
                    return Err(KError::config(format!(
                        "interior of process {p} overlaps that of process {q}"
                    )));
                }
            }
        }

        let (nx, ny) = (mesh.local_nx(), mesh.local_ny());
        let mut rows = Vec::new();
        for x in 0..nx {
            for y in 0..ny {
                if let Some(kind) = classify(mesh, x, y, include_y) {
                    rows.push(Row { x, y, kind });
                }
            }
        }
        let n_local = rows.len();
        let counts = comm.all_gather_usize(&[n_local]);
        let offset: usize = counts[..comm.rank()].iter().sum();
        let n_global: usize = counts.iter().sum();

        let mut numbering = Field2D::filled(nx, ny, -1.0);
        for (k, row) in rows.iter().enumerate() {
            numbering[(row.x, row.y)] = (offset + k) as f64;
        }
        mesh.communicate(&mut numbering);

        let mut columns = vec![None; nx * ny];
        let mut ghosts = Vec::new();
        let mut ghost_globals = Vec::new();
        let mut ghost_cols: HashMap<usize, usize> = HashMap::new();
        for x in 0..nx {
            for y in 0..ny {
                let v = numbering[(x, y)];
                if v < 0.0 {
                    continue;
                }
                let g = v.round() as usize;
                let col = if (offset..offset + n_local).contains(&g) {
                    g - offset
                } else {
                    *ghost_cols.entry(g).or_insert_with(|| {
                        ghosts.push((x, y));
                        ghost_globals.push(g);
                        n_local + ghosts.len() - 1
                    })
                };
                columns[x * ny + y] = Some(col);
            }
        }

        let mut by_y: Vec<Vec<usize>> = vec![Vec::new(); ny];
        let mut y_ranges: Vec<Option<(usize, usize)>> = vec![None; nx];
        for (k, row) in rows.iter().enumerate() {
            by_y[row.y].push(k);
            let r = y_ranges[row.x].get_or_insert((row.y, row.y));
            r.0 = r.0.min(row.y);
            r.1 = r.1.max(row.y);
        }
        let lines = by_y.into_iter().filter(|l| !l.is_empty()).collect();
        let x_lo = y_ranges.iter().position(Option::is_some).unwrap_or(xs);
        let x_hi = y_ranges.iter().rposition(Option::is_some).unwrap_or(xe);

        log::debug!(
            "laplacexy index map: {n_local} local rows from {offset}, {} ghosts, {n_global} global",
            ghosts.len()
        );
        Ok(Self {
            nx,
            ny,
            rows,
            columns,
            ghosts,
            ghost_globals,
            offset,
            n_global,
            lines,
            x_range: (x_lo, x_hi),
            y_ranges,
        })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn n_local(&self) -> usize {
        self.rows.len()
    }

    pub fn n_ghost(&self) -> usize {
        self.ghosts.len()
    }

    pub fn n_global(&self) -> usize {
        self.n_global
    }

    /// Global index of local row 0.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Local column of cell `(x, y)`: a row number when owned, `n_local + k`
    /// for the k-th ghost, `None` when the cell has no index.
    pub fn column(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.nx || y >= self.ny {
            return None;
        }
        self.columns[x * self.ny + y]
    }

    /// Global index of cell `(x, y)`, if it has one.
    pub fn global_index(&self, x: usize, y: usize) -> Option<usize> {
        let col = self.column(x, y)?;
        if col < self.n_local() {
            return Some(self.offset + col);
        }
        self.ghost_globals.get(col - self.n_local()).copied()
    }

    /// Cells supplying the ghost columns, in column order.
    pub fn ghost_cells(&self) -> &[(usize, usize)] {
        &self.ghosts
    }

    /// Local rows grouped into X lines (one per Y index).
    pub fn lines(&self) -> &[Vec<usize>] {
        &self.lines
    }

    /// Nearest owned cell to `(x, y)`: X clamped to the owned columns, then Y
    /// clamped to that column's owned range.
    pub fn nearest_owned(&self, x: usize, y: usize) -> (usize, usize) {
        let cx = x.clamp(self.x_range.0, self.x_range.1);
        match self.y_ranges[cx] {
            Some((lo, hi)) => (cx, y.clamp(lo, hi)),
            None => (cx, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MockMesh;

    fn kinds(map: &IndexMapper) -> Vec<RowKind> {
        map.rows().iter().map(|r| r.kind).collect()
    }

    #[test]
    fn ramp_rows_include_both_x_boundaries() {
        let map = IndexMapper::build(&MockMesh::new(5, 1), false).unwrap();
        assert_eq!(
            kinds(&map),
            vec![RowKind::InnerX, RowKind::Interior, RowKind::Interior, RowKind::Interior, RowKind::OuterX]
        );
        assert_eq!(map.n_global(), 5);
        assert_eq!(map.n_ghost(), 0);
        assert_eq!(map.column(2, 0), Some(2));
        assert_eq!(map.lines(), &[vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn y_boundaries_skip_corners() {
        let mesh = MockMesh::new(5, 4).with_y_guards(1);
        let map = IndexMapper::build(&mesh, true).unwrap();
        // 3x2 interior, 2 rows on each X boundary, 3 on each Y boundary
        assert_eq!(map.n_local(), 16);
        assert_eq!(map.column(0, 0), None);
        assert_eq!(map.column(4, 3), None);
        assert_eq!(map.rows()[map.column(2, 0).unwrap()].kind, RowKind::LowerY);
        assert_eq!(map.rows()[map.column(2, 3).unwrap()].kind, RowKind::UpperY);
        assert_eq!(map.nearest_owned(0, 0), (0, 1));
        assert_eq!(map.nearest_owned(2, 0), (2, 0));
    }

    #[test]
    fn y_derivatives_off_drop_y_boundary_rows() {
        let mesh = MockMesh::new(5, 4).with_y_guards(1);
        let map = IndexMapper::build(&mesh, false).unwrap();
        assert_eq!(map.n_local(), 10);
        assert_eq!(map.lines().len(), 2);
        assert!(map.lines().iter().all(|l| l.len() == 5));
    }

    #[test]
    fn periodic_guards_alias_owned_rows() {
        let mesh = MockMesh::new(5, 4).with_y_guards(1).with_periodic_y(true);
        let map = IndexMapper::build(&mesh, true).unwrap();
        assert_eq!(map.n_local(), 10);
        assert_eq!(map.column(1, 0), map.column(1, 2));
        assert_eq!(map.column(1, 3), map.column(1, 1));
        assert_eq!(map.n_ghost(), 0);
    }

    #[test]
    fn y_derivatives_need_y_guards() {
        let err = IndexMapper::build(&MockMesh::new(5, 3), true).unwrap_err();
        assert!(matches!(err, KError::Configuration(_)));
    }

    #[test]
    fn x_guards_are_required() {
        assert!(IndexMapper::build(&MockMesh::new(2, 3), false).is_err());
    }
}
