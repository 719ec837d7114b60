#![cfg(feature = "krylov")]

use approx::assert_abs_diff_eq;
use laplace_xy::{
    CellLoc, Coordinates, Field2D, KError, KspType, LaplaceXY, LaplaceXYSolver, Mesh, MockMesh, Options,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn ramp_options() -> Options {
    Options::new()
        .with("include_y_derivs", false)
        .with("x_inner_dirichlet", true)
        .with("x_outer_dirichlet", true)
        .with("rtol", 1e-10)
        .with("atol", 1e-12)
}

/// Boundary values 0 at the inner X end and 1 at the outer X end.
fn ramp_x0(nx: usize, ny: usize) -> Field2D {
    Field2D::from_fn(nx, ny, |x, _| if x + 1 == nx { 1.0 } else { 0.0 })
}

fn plane_mesh() -> MockMesh {
    MockMesh::new(8, 6)
        .with_y_guards(1)
        .with_coordinates(Coordinates::sheared(8, 6, 0.5, 1.0, 0.4))
}

fn random_fields(seed: u64, nx: usize, ny: usize) -> (Field2D, Field2D, Field2D) {
    let mut rng = StdRng::seed_from_u64(seed);
    let a = Field2D::from_fn(nx, ny, |_, _| rng.gen_range(1.0..2.0));
    let b = Field2D::from_fn(nx, ny, |_, _| rng.gen_range(0.0..0.05));
    let rhs = Field2D::from_fn(nx, ny, |_, _| rng.gen_range(-1.0..1.0));
    (a, b, rhs)
}

fn assert_fields_close(p: &Field2D, q: &Field2D, eps: f64) {
    assert_eq!((p.nx(), p.ny()), (q.nx(), q.ny()));
    for x in 0..p.nx() {
        for y in 0..p.ny() {
            assert_abs_diff_eq!(p[(x, y)], q[(x, y)], epsilon = eps);
        }
    }
}

#[test]
fn one_dimensional_ramp() {
    let mesh = MockMesh::new(5, 1);
    let mut solver = LaplaceXY::new(&mesh, Some(&ramp_options()), CellLoc::Centre).unwrap();
    solver.set_coefs(&Field2D::filled(5, 1, 1.0), &Field2D::zeros(5, 1)).unwrap();
    let x = solver.solve(&Field2D::zeros(5, 1), Some(&ramp_x0(5, 1))).unwrap();
    for (i, expect) in [0.0, 0.25, 0.5, 0.75, 1.0].into_iter().enumerate() {
        assert_abs_diff_eq!(x[(i, 0)], expect, epsilon = 1e-8);
    }
    assert_eq!(x.location(), CellLoc::Centre);
}

#[test]
fn zero_input_gives_zero_solution() {
    let mesh = plane_mesh();
    let opts = Options::new()
        .with("x_inner_dirichlet", true)
        .with("x_outer_dirichlet", true)
        .with("y_bndry_dirichlet", true);
    let mut solver = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).unwrap();
    let (a, b, _) = random_fields(1, 8, 6);
    solver.set_coefs(&a, &b).unwrap();
    let x = solver.solve(&Field2D::zeros(8, 6), None).unwrap();
    assert!(x.data().unwrap().iter().all(|&v| v == 0.0));
}

#[test]
fn all_dirichlet_converges_and_fills_every_cell() {
    let mesh = plane_mesh();
    let opts = Options::new()
        .with("x_inner_dirichlet", true)
        .with("x_outer_dirichlet", true)
        .with("y_bndry_dirichlet", true)
        .with("rtol", 1e-10)
        .with("maxits", 200);
    let mut solver = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).unwrap();
    let (a, b, rhs) = random_fields(2, 8, 6);
    solver.set_coefs(&a, &b).unwrap();
    let x = solver.solve(&rhs, None).unwrap();
    assert!(x.is_finite());
    // corners copy the nearest boundary row
    assert_eq!(x[(0, 0)], x[(0, 1)]);
    assert_eq!(x[(7, 5)], x[(7, 4)]);
    // Dirichlet rows without x0 pin the boundary to zero
    assert_eq!(x[(0, 2)], 0.0);
    assert_eq!(x[(3, 0)], 0.0);
}

/// Boundary rows are identity rows that keep their columns in the interior
/// rows, so only the interior block is symmetric. It is negative definite
/// for A > 0 and B >= 0, which is what CG relies on.
#[test]
fn interior_block_is_symmetric_on_uniform_metric() {
    let mesh = MockMesh::new(7, 6).with_y_guards(1).with_coordinates(Coordinates::uniform(7, 6, 0.7, 1.3));
    let opts = Options::new().with("averaging", "harmonic");
    let mut solver = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).unwrap();
    let (a, b, _) = random_fields(3, 7, 6);
    solver.set_coefs(&a, &b).unwrap();
    let interior: Vec<usize> = solver
        .index_map()
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.kind.is_boundary())
        .map(|(k, _)| k)
        .collect();
    let block = solver.matrix().submatrix(&interior);
    assert!(block.asymmetry() < 1e-12);
    for k in 0..block.nrows() {
        assert!(block.get(k, k) < 0.0);
    }
}

#[test]
fn cg_matches_gmres_with_every_boundary_dirichlet() {
    let mesh = MockMesh::new(8, 6).with_y_guards(1).with_coordinates(Coordinates::uniform(8, 6, 0.7, 1.3));
    let (a, b, rhs) = random_fields(9, 8, 6);
    let x0 = Field2D::from_fn(8, 6, |x, _| if x == 7 { 1.0 } else { 0.0 });
    let base = Options::new()
        .with("averaging", "harmonic")
        .with("x_inner_dirichlet", true)
        .with("x_outer_dirichlet", true)
        .with("y_bndry_dirichlet", true)
        .with("rtol", 1e-11)
        .with("atol", 1e-13)
        .with("maxits", 300);
    let solve_with = |ksp: &str, pc: &str| {
        let opts = base.clone().with("ksptype", ksp).with("pctype", pc);
        let mut s = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).unwrap();
        s.set_coefs(&a, &b).unwrap();
        s.solve(&rhs, Some(&x0)).unwrap_or_else(|e| panic!("{ksp}/{pc}: {e}"))
    };
    let reference = solve_with("gmres", "lu");
    for pc in ["none", "jacobi"] {
        assert_fields_close(&solve_with("cg", pc), &reference, 1e-7);
    }
    assert_abs_diff_eq!(reference[(7, 3)], 1.0, epsilon = 1e-12);
}

#[test]
fn repeated_solves_are_identical() {
    let mesh = plane_mesh();
    let mut solver = LaplaceXY::new(&mesh, Some(&Options::new().with("x_inner_dirichlet", true)), CellLoc::Centre).unwrap();
    let (a, b, rhs) = random_fields(4, 8, 6);
    solver.set_coefs(&a, &b).unwrap();
    let x0 = Field2D::filled(8, 6, 0.3);
    let first = solver.solve(&rhs, Some(&x0)).unwrap();
    let second = solver.solve(&rhs, Some(&x0)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn new_coefficients_keep_the_pattern() {
    let mesh = plane_mesh();
    let mut solver = LaplaceXY::new(&mesh, None, CellLoc::Centre).unwrap();
    let before = solver.structure_fingerprint();
    let (a, b, _) = random_fields(5, 8, 6);
    solver.set_coefs(&a, &b).unwrap();
    let first = solver.structure_fingerprint();
    let values = solver.matrix().values().to_vec();
    let (a, b, _) = random_fields(6, 8, 6);
    solver.set_coefs(&a, &b).unwrap();
    assert_eq!(before, first);
    assert_eq!(first, solver.structure_fingerprint());
    assert_ne!(values, solver.matrix().values());
}

#[test]
fn without_y_derivatives_slices_decouple() {
    let (nx, ny) = (7, 3);
    let a = |x: usize, y: usize| 1.0 + x as f64 + 0.5 * y as f64;
    let b = |_: usize, y: usize| -0.01 * y as f64;
    let rhs = |x: usize, y: usize| ((x * (y + 1)) as f64).sin();
    let x0 = |x: usize, y: usize| if x == 0 { y as f64 } else if x + 1 == nx { 1.0 } else { 0.0 };
    let opts = ramp_options().with("rtol", 1e-12).with("atol", 1e-14);

    let mesh = MockMesh::new(nx, ny);
    let mut full = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).unwrap();
    full.set_coefs(&Field2D::from_fn(nx, ny, a), &Field2D::from_fn(nx, ny, b)).unwrap();
    let sol = full
        .solve(&Field2D::from_fn(nx, ny, rhs), Some(&Field2D::from_fn(nx, ny, x0)))
        .unwrap();

    let slice_mesh = MockMesh::new(nx, 1);
    let mut slice = LaplaceXY::new(&slice_mesh, Some(&opts), CellLoc::Centre).unwrap();
    for y in 0..ny {
        slice
            .set_coefs(&Field2D::from_fn(nx, 1, |x, _| a(x, y)), &Field2D::from_fn(nx, 1, |x, _| b(x, y)))
            .unwrap();
        let s = slice
            .solve(&Field2D::from_fn(nx, 1, |x, _| rhs(x, y)), Some(&Field2D::from_fn(nx, 1, |x, _| x0(x, y))))
            .unwrap();
        for x in 0..nx {
            assert_abs_diff_eq!(sol[(x, y)], s[(x, 0)], epsilon = 1e-8);
        }
    }
}

#[test]
fn solve_before_set_coefs_is_a_configuration_error() {
    let mesh = MockMesh::new(5, 1);
    let solver = LaplaceXY::new(&mesh, Some(&ramp_options()), CellLoc::Centre).unwrap();
    let err = solver.solve(&Field2D::zeros(5, 1), None).unwrap_err();
    assert!(matches!(err, KError::Configuration(_)), "{err}");
}

#[test]
fn failed_solve_leaves_solver_usable() {
    let nx = 12;
    let mesh = MockMesh::new(nx, 1);
    let opts = ramp_options()
        .with("rtol", 1e-8)
        .with("atol", 0.0)
        .with("maxits", 1)
        .with("pctype", "none");
    let mut weak = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).unwrap();
    let a = Field2D::from_fn(nx, 1, |x, _| 1.0 + x as f64);
    let b = Field2D::zeros(nx, 1);
    weak.set_coefs(&a, &b).unwrap();
    let rhs = Field2D::zeros(nx, 1);
    let err = weak.solve(&rhs, Some(&ramp_x0(nx, 1))).unwrap_err();
    assert!(matches!(err, KError::Convergence { .. }), "{err}");

    let mut exact = LaplaceXY::new(&mesh, Some(&ramp_options().with("rtol", 1e-13)), CellLoc::Centre).unwrap();
    exact.set_coefs(&a, &b).unwrap();
    let good = exact.solve(&rhs, Some(&ramp_x0(nx, 1))).unwrap();

    // Retry from a better initial guess.
    let retried = weak.solve(&rhs, Some(&good)).unwrap();
    assert_fields_close(&retried, &good, 1e-12);
}

#[test]
fn fields_at_the_wrong_location_are_rejected() {
    let mesh = MockMesh::new(5, 1);
    let mut solver = LaplaceXY::new(&mesh, Some(&ramp_options()), CellLoc::Centre).unwrap();
    let a_low = Field2D::filled(5, 1, 1.0).with_location(CellLoc::XLow);
    let err = solver.set_coefs(&a_low, &Field2D::zeros(5, 1)).unwrap_err();
    assert!(matches!(err, KError::Configuration(_)));

    solver.set_coefs(&Field2D::filled(5, 1, 1.0), &Field2D::zeros(5, 1)).unwrap();
    let rhs = Field2D::zeros(5, 1).with_location(CellLoc::YLow);
    assert!(matches!(solver.solve(&rhs, None), Err(KError::Configuration(_))));
    assert!(matches!(solver.solve(&Field2D::unallocated(5, 1), None), Err(KError::Configuration(_))));
    assert!(matches!(solver.solve(&Field2D::zeros(4, 1), None), Err(KError::Configuration(_))));
    // an unallocated x0 means "no initial guess"
    assert!(solver.solve(&Field2D::zeros(5, 1), Some(&Field2D::unallocated(5, 1))).is_ok());
}

#[test]
fn solver_combinations_agree() {
    let mesh = plane_mesh();
    let (a, b, rhs) = random_fields(7, 8, 6);
    let base = Options::new()
        .with("x_inner_dirichlet", true)
        .with("x_outer_dirichlet", true)
        .with("rtol", 1e-11)
        .with("atol", 1e-13)
        .with("maxits", 500);
    let solve_with = |ksp: &str, pc: &str, side: &str| {
        let opts = base.clone().with("ksptype", ksp).with("pctype", pc).with("pcside", side);
        let mut s = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).unwrap();
        s.set_coefs(&a, &b).unwrap();
        s.solve(&rhs, None).unwrap_or_else(|e| panic!("{ksp}/{pc}/{side}: {e}"))
    };
    let reference = solve_with("gmres", "lu", "right");
    for (ksp, pc, side) in [
        ("gmres", "ilu", "left"),
        ("gmres", "jacobi", "right"),
        ("gmres", "sor", "right"),
        ("gmres", "xlines", "left"),
        ("bicgstab", "ilu", "right"),
        ("bicgstab", "xlines", "right"),
        ("preonly", "lu", "right"),
    ] {
        let x = solve_with(ksp, pc, side);
        assert_fields_close(&x, &reference, 1e-7);
    }
}

#[test]
fn harmonic_averaging_keeps_flux_constant() {
    let nx = 10;
    let mesh = MockMesh::new(nx, 1);
    let opts = ramp_options().with("averaging", "harmonic");
    let mut solver = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).unwrap();
    let a = Field2D::from_fn(nx, 1, |x, _| if x < nx / 2 { 1.0 } else { 10.0 });
    solver.set_coefs(&a, &Field2D::zeros(nx, 1)).unwrap();
    let x = solver.solve(&Field2D::zeros(nx, 1), Some(&ramp_x0(nx, 1))).unwrap();
    let harmonic = |p: f64, q: f64| 2.0 * p * q / (p + q);
    let flux: Vec<f64> = (0..nx - 1)
        .map(|i| harmonic(a[(i, 0)], a[(i + 1, 0)]) * (x[(i + 1, 0)] - x[(i, 0)]))
        .collect();
    for f in &flux {
        assert_abs_diff_eq!(*f, flux[0], epsilon = 1e-8);
    }

    let mut arith = LaplaceXY::new(&mesh, Some(&ramp_options()), CellLoc::Centre).unwrap();
    arith.set_coefs(&a, &Field2D::zeros(nx, 1)).unwrap();
    let y = arith.solve(&Field2D::zeros(nx, 1), Some(&ramp_x0(nx, 1))).unwrap();
    assert!(x.max_abs_diff(&y) > 1e-6);
}

#[test]
fn options_from_json() {
    let root = Options::from_json(
        r#"{
            "laplacexy": {
                "ksptype": "bicgstab",
                "pctype": "jacobi",
                "include_y_derivs": false,
                "x_inner_dirichlet": "yes",
                "x_outer_dirichlet": true,
                "rtol": 1e-10,
                "atol": 1e-12,
                "monitor_interval": 5
            }
        }"#,
    )
    .unwrap();
    let mesh = MockMesh::new(5, 1);
    let mut solver = LaplaceXY::new(&mesh, root.section("laplacexy"), CellLoc::Centre).unwrap();
    assert_eq!(solver.config().ksptype, KspType::Bicgstab);
    solver.set_coefs(&Field2D::filled(5, 1, 2.0), &Field2D::zeros(5, 1)).unwrap();
    let x = solver.solve(&Field2D::zeros(5, 1), Some(&ramp_x0(5, 1))).unwrap();
    assert_abs_diff_eq!(x[(2, 0)], 0.5, epsilon = 1e-8);
}

#[test]
fn bad_options_fail_construction() {
    let mesh = MockMesh::new(5, 1);
    for opts in [
        Options::new().with("ksptype", "nope"),
        Options::new().with("rtol", -1.0),
        Options::new().with("include_y_derivs", "maybe"),
    ] {
        let err = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre).err().unwrap();
        assert!(matches!(err, KError::Configuration(_)), "{err}");
    }
    // default include_y_derivs needs Y guard cells
    assert!(LaplaceXY::new(&mesh, None, CellLoc::Centre).is_err());
    assert_eq!(mesh.local_ny(), 1);
}
