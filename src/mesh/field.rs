//! Per-point scalar field on the local part of the X-Y plane.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Where a field's samples sit within a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellLoc {
    #[default]
    Centre,
    XLow,
    YLow,
}

impl fmt::Display for CellLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellLoc::Centre => "CELL_CENTRE",
            CellLoc::XLow => "CELL_XLOW",
            CellLoc::YLow => "CELL_YLOW",
        })
    }
}

/// `nx × ny` real values including guard cells, stored x-major
/// (`data[x * ny + y]`). A field may be declared without storage; such a
/// field is "unallocated" and cannot be read.
#[derive(Debug, Clone, PartialEq)]
pub struct Field2D {
    nx: usize,
    ny: usize,
    location: CellLoc,
    data: Option<Vec<f64>>,
}

impl Field2D {
    pub fn unallocated(nx: usize, ny: usize) -> Self {
        Self { nx, ny, location: CellLoc::Centre, data: None }
    }

    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self::filled(nx, ny, 0.0)
    }

    pub fn filled(nx: usize, ny: usize, value: f64) -> Self {
        Self { nx, ny, location: CellLoc::Centre, data: Some(vec![value; nx * ny]) }
    }

    pub fn from_fn(nx: usize, ny: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(nx * ny);
        for x in 0..nx {
            for y in 0..ny {
                data.push(f(x, y));
            }
        }
        Self { nx, ny, location: CellLoc::Centre, data: Some(data) }
    }

    pub fn with_location(mut self, location: CellLoc) -> Self {
        self.location = location;
        self
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn location(&self) -> CellLoc {
        self.location
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Storage in x-major order, if allocated.
    pub fn data(&self) -> Option<&[f64]> {
        self.data.as_deref()
    }

    /// Mutable storage, allocating zeros first if needed.
    pub fn data_mut(&mut self) -> &mut [f64] {
        let n = self.nx * self.ny;
        self.data.get_or_insert_with(|| vec![0.0; n])
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.nx || y >= self.ny {
            return None;
        }
        self.data.as_ref().map(|d| d[x * self.ny + y])
    }

    /// True if allocated and every value is finite.
    pub fn is_finite(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.iter().all(|v| v.is_finite()))
    }

    /// Largest absolute difference to `other` over all points.
    pub fn max_abs_diff(&self, other: &Field2D) -> f64 {
        match (self.data(), other.data()) {
            (Some(a), Some(b)) if a.len() == b.len() => {
                a.iter().zip(b).map(|(p, q)| (p - q).abs()).fold(0.0, f64::max)
            }
            _ => f64::INFINITY,
        }
    }
}

impl Index<(usize, usize)> for Field2D {
    type Output = f64;

    /// Panics if the field is unallocated or the point is out of range.
    fn index(&self, (x, y): (usize, usize)) -> &f64 {
        assert!(x < self.nx && y < self.ny, "({x}, {y}) outside {}x{} field", self.nx, self.ny);
        match &self.data {
            Some(d) => &d[x * self.ny + y],
            None => panic!("read of unallocated field"),
        }
    }
}

impl IndexMut<(usize, usize)> for Field2D {
    /// Writing into an unallocated field allocates it (zeros) first.
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut f64 {
        assert!(x < self.nx && y < self.ny, "({x}, {y}) outside {}x{} field", self.nx, self.ny);
        let ny = self.ny;
        &mut self.data_mut()[x * ny + y]
    }
}
