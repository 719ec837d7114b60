use crate::config::{DirichletBoundaries, LaplaceXyConfig, Options};
use crate::context::{KspContext, PC};
use crate::core::DistributedInnerProduct;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::mesh::{CellLoc, Field2D, Mesh};
use crate::parallel::{Comm, configure_threads};
use crate::preconditioner::Preconditioner;

use super::LaplaceXYSolver;
use super::assembly;
use super::index::IndexMapper;
use super::operator::{PcCallback, XyOperator};
use super::stencil::Discretizer;

/// Solver for Div(A Grad_perp x) + B x = b on the X-Y plane of `mesh`.
///
/// Construction numbers the rows and fixes the sparsity pattern;
/// [`set_coefs`](LaplaceXYSolver::set_coefs) refills the values and sets up
/// the preconditioner; [`solve`](LaplaceXYSolver::solve) runs the Krylov
/// iteration. Every operation is collective over the mesh's plane
/// communicator: all processes must make the same calls in the same order.
pub struct LaplaceXY<'a, G: Mesh> {
    mesh: &'a G,
    location: CellLoc,
    config: LaplaceXyConfig,
    dirichlet: DirichletBoundaries,
    map: IndexMapper,
    matrix: CsrMatrix<f64>,
    ksp: KspContext,
    pc: PC<f64>,
    pc_state: Option<PcCallback>,
    coefs_set: bool,
}

/// Turn a local result into one every process agrees on: if any process
/// failed, all of them return an error.
fn agree<C: Comm, T>(comm: &C, local: Result<T, KError>, what: &str) -> Result<T, KError> {
    let failed = comm.any(local.is_err());
    match local {
        Ok(_) if failed => Err(KError::config(format!("{what} failed on another process"))),
        other => other,
    }
}

impl<'a, G: Mesh> LaplaceXY<'a, G> {
    /// Build the solver for fields at `location`. `options` is the
    /// `laplacexy` option section; `None` takes every default.
    pub fn new(mesh: &'a G, options: Option<&Options>, location: CellLoc) -> Result<Self, KError> {
        let comm = mesh.xy_comm();
        let config = agree(comm, LaplaceXyConfig::from_options(options), "option parsing")?;
        Self::with_config(mesh, config, location)
    }

    /// As [`new`](Self::new), from already-typed settings.
    pub fn with_config(mesh: &'a G, config: LaplaceXyConfig, location: CellLoc) -> Result<Self, KError> {
        let comm = mesh.xy_comm();
        agree(comm, config.validate(), "option validation")?;
        if let Some(n) = config.threads {
            if let Err(e) = configure_threads(n) {
                log::warn!("laplacexy: {e}");
            }
        }
        let metrics = match mesh.coordinates(location) {
            Some(c) => c.validate(mesh.local_nx(), mesh.local_ny()),
            None => Err(KError::config(format!("mesh has no metric at {location}"))),
        };
        agree(comm, metrics, "metric validation")?;

        let include_y = config.include_y_derivs;
        let dirichlet = config.dirichlet();
        let map = IndexMapper::build(mesh, include_y)?;
        let matrix = agree(comm, assembly::pattern(&map, include_y, dirichlet), "pattern build")?;
        let ksp = KspContext::from_config(&config);
        let pc = PC::from_type(config.pctype, config.sor_omega, config.sor_its, map.lines());
        log::debug!(
            "laplacexy: {} with {} at {location}, {} global rows, dirichlet {dirichlet:?}",
            config.ksptype,
            config.pctype,
            map.n_global()
        );
        Ok(Self {
            mesh,
            location,
            config,
            dirichlet,
            map,
            matrix,
            ksp,
            pc,
            pc_state: None,
            coefs_set: false,
        })
    }

    fn check_field(&self, f: &Field2D, name: &str) -> Result<(), KError> {
        let (nx, ny) = (self.mesh.local_nx(), self.mesh.local_ny());
        if !f.is_allocated() {
            return Err(KError::config(format!("{name} is not allocated")));
        }
        if f.nx() != nx || f.ny() != ny {
            return Err(KError::config(format!("{name} is {}x{}, mesh is {nx}x{ny}", f.nx(), f.ny())));
        }
        if f.location() != self.location {
            return Err(KError::config(format!(
                "{name} is at {}, solver is at {}",
                f.location(),
                self.location
            )));
        }
        Ok(())
    }

    /// New values for the current pattern plus a preconditioner set up on
    /// them; nothing is committed here.
    fn assemble(&self, a: &Field2D, b: &Field2D) -> Result<(CsrMatrix<f64>, Option<PcCallback>), KError> {
        self.check_field(a, "A")?;
        self.check_field(b, "B")?;
        if !a.is_finite() || !b.is_finite() {
            return Err(KError::config("A and B must be finite everywhere"));
        }
        let coords = self
            .mesh
            .coordinates(self.location)
            .ok_or_else(|| KError::config(format!("mesh has no metric at {}", self.location)))?;
        let disc = Discretizer::new(
            coords,
            a,
            b,
            self.config.averaging,
            self.config.include_y_derivs,
            self.dirichlet,
        );
        let mut matrix = self.matrix.clone();
        assembly::fill(&mut matrix, &self.map, &disc)?;
        let pc = self.pc.build(&matrix.local_block(self.map.n_local()))?;
        Ok((matrix, pc.map(PcCallback::new)))
    }

    /// Copy the solution onto a field: owned rows first, every other cell
    /// from its nearest owned cell, then guard cells from neighbours.
    fn to_field(&self, x: &[f64]) -> Field2D {
        let (nx, ny) = (self.mesh.local_nx(), self.mesh.local_ny());
        let mut owned = Field2D::zeros(nx, ny);
        for (row, &v) in self.map.rows().iter().zip(x) {
            owned[(row.x, row.y)] = v;
        }
        let mut out = Field2D::from_fn(nx, ny, |cx, cy| match self.map.column(cx, cy) {
            Some(k) if k < self.map.n_local() => x[k],
            _ => owned[self.map.nearest_owned(cx, cy)],
        })
        .with_location(self.location);
        self.mesh.communicate(&mut out);
        out
    }

    pub fn config(&self) -> &LaplaceXyConfig {
        &self.config
    }

    /// The assembled matrix: local rows, owned columns then ghost columns.
    pub fn matrix(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    pub fn index_map(&self) -> &IndexMapper {
        &self.map
    }

    pub fn structure_fingerprint(&self) -> u64 {
        self.matrix.structure_fingerprint()
    }
}

impl<G: Mesh> LaplaceXYSolver for LaplaceXY<'_, G> {
    fn set_coefs(&mut self, a: &Field2D, b: &Field2D) -> Result<(), KError> {
        let comm = self.mesh.xy_comm();
        let (matrix, pc_state) = agree(comm, self.assemble(a, b), "set_coefs")?;
        debug_assert!(matrix.same_pattern(&self.matrix));
        self.matrix = matrix;
        self.pc_state = pc_state;
        self.coefs_set = true;
        Ok(())
    }

    fn solve(&self, rhs: &Field2D, x0: Option<&Field2D>) -> Result<Field2D, KError> {
        if !self.coefs_set {
            return Err(KError::config("solve called before set_coefs"));
        }
        let comm = self.mesh.xy_comm();
        let x0 = x0.filter(|f| f.is_allocated());
        let checked = self
            .check_field(rhs, "rhs")
            .and_then(|()| x0.map_or(Ok(()), |f| self.check_field(f, "x0")));
        agree(comm, checked, "solve argument check")?;

        let b = assembly::rhs_vector(&self.map, rhs, x0, self.dirichlet);
        let mut x = assembly::initial_guess(&self.map, x0);
        let op = XyOperator::new(self.mesh, &self.map, &self.matrix);
        let pc = self
            .pc_state
            .as_ref()
            .map(|p| p as &dyn Preconditioner<XyOperator<'_, G>, Vec<f64>>);
        let stats = self.ksp.solve(&op, pc, DistributedInnerProduct::new(comm), &b, &mut x)?;
        if !stats.converged {
            log::warn!(
                "laplacexy: {} failed with {} after {} iterations",
                self.config.ksptype,
                stats.reason,
                stats.iterations
            );
            return Err(KError::Convergence {
                reason: stats.reason,
                iterations: stats.iterations,
                residual: stats.final_residual,
            });
        }
        Ok(self.to_field(&x))
    }

    fn location(&self) -> CellLoc {
        self.location
    }
}
