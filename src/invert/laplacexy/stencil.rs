//! Finite-volume stencil of Div(A Grad_perp x) + B x.
//!
//! Fluxes are evaluated on the faces between a point and its neighbours,
//! with metric terms averaged arithmetically onto the face and `A` averaged
//! by the configured [`FaceAveraging`] rule. Each face contributes `+c` to
//! the neighbour column and `-c` to the diagonal, so the interior rows of a
//! uniform-metric grid form a symmetric matrix.

use crate::config::{DirichletBoundaries, FaceAveraging};
use crate::mesh::{Coordinates, Field2D};

use super::index::{Row, RowKind};

/// Coefficients of one row: the diagonal plus weighted neighbour cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Stencil {
    pub centre: f64,
    pub neighbours: Vec<((usize, usize), f64)>,
}

fn dirichlet_flag(kind: RowKind) -> DirichletBoundaries {
    match kind {
        RowKind::InnerX => DirichletBoundaries::INNER_X,
        RowKind::OuterX => DirichletBoundaries::OUTER_X,
        RowKind::LowerY | RowKind::UpperY => DirichletBoundaries::Y,
        RowKind::Interior => DirichletBoundaries::empty(),
    }
}

/// Whether `row` is a Dirichlet (identity) row under `dirichlet`.
pub fn is_dirichlet(row: &Row, dirichlet: DirichletBoundaries) -> bool {
    row.kind.is_boundary() && dirichlet.contains(dirichlet_flag(row.kind))
}

/// Cells, other than the row's own, that the row couples to. Depends only on
/// the row kind and the boundary flags, never on coefficient values, so it
/// fixes the sparsity pattern.
pub fn neighbours(row: &Row, include_y: bool, dirichlet: DirichletBoundaries) -> Vec<(usize, usize)> {
    let (x, y) = (row.x, row.y);
    if is_dirichlet(row, dirichlet) {
        return Vec::new();
    }
    match row.kind {
        RowKind::Interior => {
            let mut cells = vec![(x - 1, y), (x + 1, y)];
            if include_y {
                cells.push((x, y - 1));
                cells.push((x, y + 1));
            }
            cells
        }
        RowKind::InnerX => vec![(x + 1, y)],
        RowKind::OuterX => vec![(x - 1, y)],
        RowKind::LowerY => vec![(x, y + 1)],
        RowKind::UpperY => vec![(x, y - 1)],
    }
}

/// Evaluates row stencils for one set of coefficients.
pub struct Discretizer<'a> {
    coords: &'a Coordinates,
    a: &'a Field2D,
    b: &'a Field2D,
    averaging: FaceAveraging,
    include_y: bool,
    dirichlet: DirichletBoundaries,
}

impl<'a> Discretizer<'a> {
    pub fn new(
        coords: &'a Coordinates,
        a: &'a Field2D,
        b: &'a Field2D,
        averaging: FaceAveraging,
        include_y: bool,
        dirichlet: DirichletBoundaries,
    ) -> Self {
        Self { coords, a, b, averaging, include_y, dirichlet }
    }

    fn face(&self, f: &Field2D, p: (usize, usize), q: (usize, usize)) -> f64 {
        0.5 * (f[p] + f[q])
    }

    /// Flux coefficient through the X face between `p` and `q`.
    pub fn x_face(&self, p: (usize, usize), q: (usize, usize)) -> f64 {
        let c = self.coords;
        let a_f = self.averaging.average(self.a[p], self.a[q]);
        let j_f = self.face(&c.j, p, q);
        let g11_f = self.face(&c.g11, p, q);
        let dx_f = self.face(&c.dx, p, q);
        a_f * j_f * g11_f / (c.j[p] * dx_f * c.dx[p])
    }

    /// Flux coefficient through the Y face between `p` and `q`: only the
    /// part of the Y gradient perpendicular to the field line.
    pub fn y_face(&self, p: (usize, usize), q: (usize, usize)) -> f64 {
        let c = self.coords;
        let a_f = self.averaging.average(self.a[p], self.a[q]);
        let j_f = self.face(&c.j, p, q);
        let g23_f = self.face(&c.g23, p, q);
        let g_23_f = self.face(&c.g_23, p, q);
        let g_22_f = self.face(&c.g_22, p, q);
        let dy_f = self.face(&c.dy, p, q);
        -a_f * j_f * g23_f * g_23_f / (g_22_f * c.j[p] * dy_f * c.dy[p])
    }

    pub fn row(&self, row: &Row) -> Stencil {
        let p = (row.x, row.y);
        let cells = neighbours(row, self.include_y, self.dirichlet);
        if row.kind.is_boundary() {
            // Dirichlet: x_b = value. Neumann: x_b - x_inside = 0.
            return Stencil {
                centre: 1.0,
                neighbours: cells.into_iter().map(|q| (q, -1.0)).collect(),
            };
        }
        let neighbours: Vec<_> = cells
            .into_iter()
            .map(|q| {
                let c = if q.1 == p.1 { self.x_face(p, q) } else { self.y_face(p, q) };
                (q, c)
            })
            .collect();
        let centre = self.b[p] - neighbours.iter().map(|(_, c)| c).sum::<f64>();
        Stencil { centre, neighbours }
    }
}
