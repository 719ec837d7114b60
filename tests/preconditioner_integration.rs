//! Preconditioners paired with the Krylov solvers on small sparse systems.
//!
//! Each system has the known solution x = [1, ..., 1]; the checks are on
//! convergence, on accuracy, and on preconditioners that should make the
//! iteration cheaper actually doing so.

#![cfg(feature = "krylov")]

use laplace_xy::matrix::CsrMatrix;
use laplace_xy::preconditioner::{BlockJacobi, Ilu0, Jacobi, MatSorType, Preconditioner, Sor};
use laplace_xy::solver::{BiCgStabSolver, GmresSolver, LinearSolver, PcgSolver, PreOnlySolver, Preconditioning};
use laplace_xy::core::traits::MatVec;

fn tridiag(n: usize, lower: f64, diag: impl Fn(usize) -> f64, upper: f64) -> CsrMatrix<f64> {
    let pattern = (0..n).map(|i| (i.saturating_sub(1)..(i + 2).min(n)).collect()).collect();
    let mut a = CsrMatrix::from_pattern(n, pattern);
    for i in 0..n {
        a.add_value(i, i, diag(i)).unwrap();
        if i > 0 {
            a.add_value(i, i - 1, lower).unwrap();
        }
        if i + 1 < n {
            a.add_value(i, i + 1, upper).unwrap();
        }
    }
    a
}

/// Right-hand side for the all-ones solution.
fn rhs_for_ones(a: &CsrMatrix<f64>) -> Vec<f64> {
    let mut b = vec![0.0; a.nrows()];
    a.matvec(&vec![1.0; a.ncols()], &mut b);
    b
}

fn rel_error(x: &[f64]) -> f64 {
    let num: f64 = x.iter().map(|xi| (xi - 1.0).powi(2)).sum();
    (num / x.len() as f64).sqrt()
}

type Pc = dyn Preconditioner<CsrMatrix<f64>, Vec<f64>>;

#[test]
fn pcg_with_jacobi_on_badly_scaled_diagonal() {
    // Diagonal spanning six orders of magnitude: Jacobi makes it trivial.
    let a = tridiag(30, -0.1, |i| 10f64.powi((i % 7) as i32), -0.1);
    let b = rhs_for_ones(&a);
    let mut pc = Jacobi::<f64>::new();
    pc.setup(&a).unwrap();

    let mut plain = vec![0.0; 30];
    let plain_stats = PcgSolver::new(1e-10, 500).solve(&a, None, &b, &mut plain).unwrap();
    let mut x = vec![0.0; 30];
    let stats = PcgSolver::new(1e-10, 500).solve(&a, Some(&pc as &Pc), &b, &mut x).unwrap();
    assert!(stats.converged, "{stats:?}");
    assert!(rel_error(&x) < 1e-8);
    assert!(stats.iterations <= plain_stats.iterations);
}

#[test]
fn gmres_left_and_right_with_ilu0() {
    let a = tridiag(50, -1.5, |i| 4.0 + 0.05 * i as f64, -0.5);
    let b = rhs_for_ones(&a);
    let mut pc = Ilu0::<f64>::new();
    pc.setup(&a).unwrap();
    for side in [Preconditioning::Left, Preconditioning::Right] {
        let mut x = vec![0.0; 50];
        let stats = GmresSolver::new(20, 1e-10, 200)
            .with_preconditioning(side)
            .solve(&a, Some(&pc as &Pc), &b, &mut x)
            .unwrap();
        assert!(stats.converged, "{side:?}: {stats:?}");
        // ILU(0) of a tridiagonal matrix is the exact LU.
        assert!(stats.iterations <= 2, "{side:?}: {stats:?}");
        assert!(rel_error(&x) < 1e-8);
    }
}

#[test]
fn bicgstab_with_symmetric_sor() {
    let a = tridiag(40, -1.0, |_| 2.5, -0.7);
    let b = rhs_for_ones(&a);
    let mut pc = Sor::<f64>::new(1.2, 2);
    pc.setup(&a).unwrap();
    let mut x = vec![0.0; 40];
    let stats = BiCgStabSolver::new(1e-10, 300).solve(&a, Some(&pc as &Pc), &b, &mut x).unwrap();
    assert!(stats.converged, "{stats:?}");
    assert!(rel_error(&x) < 1e-8);
}

#[test]
fn sor_on_identity_is_identity() {
    let a = tridiag(5, 0.0, |_| 1.0, 0.0);
    let mut pc = Sor::<f64>::new(1.0, 1).with_sweep(MatSorType::APPLY_LOWER);
    pc.setup(&a).unwrap();
    let r = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let mut z = vec![0.0; 5];
    pc.apply(&r, &mut z).unwrap();
    assert_eq!(z, r);
}

#[test]
fn backward_sweep_solves_upper_triangular() {
    let a = tridiag(6, 0.0, |i| 1.0 + i as f64, -1.0);
    let b = rhs_for_ones(&a);
    let mut pc = Sor::<f64>::new(1.0, 1).with_sweep(MatSorType::APPLY_UPPER);
    pc.setup(&a).unwrap();
    let mut z = vec![0.0; 6];
    pc.apply(&b, &mut z).unwrap();
    assert!(rel_error(&z) < 1e-14);
}

#[test]
fn preonly_with_whole_block_jacobi_is_a_direct_solve() {
    let a = tridiag(25, -1.0, |i| 3.0 + (i as f64).sin(), 0.4);
    let b = rhs_for_ones(&a);
    let mut pc = BlockJacobi::whole();
    pc.setup(&a).unwrap();
    let mut x = vec![0.0; 25];
    let stats = PreOnlySolver::new().solve(&a, Some(&pc as &Pc), &b, &mut x).unwrap();
    assert!(stats.converged);
    assert!(stats.final_residual < 1e-12);
    assert!(rel_error(&x) < 1e-12);
}

#[test]
fn line_blocks_help_gmres() {
    // Two decoupled halves with strong coupling inside each: one block per
    // half is exact.
    let n = 20;
    let mut a = tridiag(n, -1.0, |_| 2.1, -1.0);
    // cut the coupling between the halves
    a.add_value(9, 10, 1.0).unwrap();
    a.add_value(10, 9, 1.0).unwrap();
    let b = rhs_for_ones(&a);
    let mut pc = BlockJacobi::new(vec![(0..10).collect(), (10..20).collect()]);
    pc.setup(&a).unwrap();
    let mut x = vec![0.0; n];
    let stats = GmresSolver::new(30, 1e-10, 100).solve(&a, Some(&pc as &Pc), &b, &mut x).unwrap();
    assert!(stats.converged);
    assert!(stats.iterations <= 2, "{stats:?}");
    assert!(rel_error(&x) < 1e-8);
}
