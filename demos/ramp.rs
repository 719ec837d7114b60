use laplace_xy::{CellLoc, Field2D, KError, LaplaceXY, LaplaceXYSolver, MockMesh, Options};

fn main() -> Result<(), KError> {
    // Five points in X, one in Y: guard, three interior points, guard.
    let nx = 5;
    let mesh = MockMesh::new(nx, 1);
    let opts = Options::new()
        .with("include_y_derivs", false)
        .with("x_inner_dirichlet", true)
        .with("x_outer_dirichlet", true)
        .with("rtol", 1e-10);

    let mut solver = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre)?;
    solver.set_coefs(&Field2D::filled(nx, 1, 1.0), &Field2D::zeros(nx, 1))?;

    // Dirichlet values come from the initial guess: 0 inside, 1 outside.
    let x0 = Field2D::from_fn(nx, 1, |x, _| if x + 1 == nx { 1.0 } else { 0.0 });
    let x = solver.solve(&Field2D::zeros(nx, 1), Some(&x0))?;

    for i in 0..nx {
        println!("x[{i}] = {:.6}", x[(i, 0)]);
    }
    Ok(())
}
