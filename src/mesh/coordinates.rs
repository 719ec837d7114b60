//! Metric coefficients of the X-Y plane at one cell location.

use super::field::Field2D;
use crate::error::KError;

/// Grid spacings, Jacobian and the metric components the perpendicular
/// Laplacian needs. `g22`/`g23` are contravariant, `g_22`/`g_23` covariant.
#[derive(Debug, Clone)]
pub struct Coordinates {
    pub dx: Field2D,
    pub dy: Field2D,
    pub j: Field2D,
    pub g11: Field2D,
    pub g22: Field2D,
    pub g_22: Field2D,
    pub g23: Field2D,
    pub g_23: Field2D,
}

impl Coordinates {
    /// Orthogonal Cartesian metric with constant spacings.
    pub fn uniform(nx: usize, ny: usize, dx: f64, dy: f64) -> Self {
        Self {
            dx: Field2D::filled(nx, ny, dx),
            dy: Field2D::filled(nx, ny, dy),
            j: Field2D::filled(nx, ny, 1.0),
            g11: Field2D::filled(nx, ny, 1.0),
            g22: Field2D::filled(nx, ny, 1.0),
            g_22: Field2D::filled(nx, ny, 1.0),
            g23: Field2D::zeros(nx, ny),
            g_23: Field2D::zeros(nx, ny),
        }
    }

    /// Constant spacings with Y and Z directions sheared by `c` (`g_23 = c`,
    /// `|c| < 1`). Contravariant components are the matching inverse, so the
    /// perpendicular part of the Y gradient is nonzero.
    pub fn sheared(nx: usize, ny: usize, dx: f64, dy: f64, c: f64) -> Self {
        let det = 1.0 - c * c;
        Self {
            g22: Field2D::filled(nx, ny, 1.0 / det),
            g23: Field2D::filled(nx, ny, -c / det),
            g_23: Field2D::filled(nx, ny, c),
            ..Self::uniform(nx, ny, dx, dy)
        }
    }

    fn fields(&self) -> [(&'static str, &Field2D); 8] {
        [
            ("dx", &self.dx),
            ("dy", &self.dy),
            ("J", &self.j),
            ("g11", &self.g11),
            ("g22", &self.g22),
            ("g_22", &self.g_22),
            ("g23", &self.g23),
            ("g_23", &self.g_23),
        ]
    }

    /// Every component allocated, `nx × ny`, finite; spacings, `J` and
    /// `g_22` nonzero (they appear in denominators).
    pub fn validate(&self, nx: usize, ny: usize) -> Result<(), KError> {
        for (name, f) in self.fields() {
            if f.nx() != nx || f.ny() != ny {
                return Err(KError::config(format!(
                    "metric {name} is {}x{}, mesh is {nx}x{ny}",
                    f.nx(),
                    f.ny()
                )));
            }
            if !f.is_finite() {
                return Err(KError::config(format!("metric {name} is unallocated or not finite")));
            }
        }
        for (name, f) in [("dx", &self.dx), ("dy", &self.dy), ("J", &self.j), ("g_22", &self.g_22)] {
            if f.data().is_some_and(|d| d.iter().any(|&v| v == 0.0)) {
                return Err(KError::config(format!("metric {name} has zero entries")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_valid() {
        let c = Coordinates::uniform(4, 3, 0.5, 2.0);
        assert!(c.validate(4, 3).is_ok());
        assert_eq!(c.dx[(3, 2)], 0.5);
        assert_eq!(c.g23[(0, 0)], 0.0);
    }

    #[test]
    fn sheared_perpendicular_factor_is_positive() {
        let c = Coordinates::sheared(3, 3, 1.0, 1.0, 0.6);
        assert!(c.validate(3, 3).is_ok());
        // g^22 - 1/g_22 = -g^23 g_23 / g_22
        let perp = -c.g23[(1, 1)] * c.g_23[(1, 1)] / c.g_22[(1, 1)];
        assert!((perp - (c.g22[(1, 1)] - 1.0)).abs() < 1e-12);
        assert!(perp > 0.0);
    }

    #[test]
    fn rejects_shape_and_zero_spacing() {
        let c = Coordinates::uniform(4, 3, 1.0, 1.0);
        assert!(matches!(c.validate(5, 3), Err(KError::Configuration(_))));
        let mut c = c;
        c.dx[(1, 1)] = 0.0;
        assert!(c.validate(4, 3).is_err());
    }
}
