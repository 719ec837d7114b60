//! Without the `krylov` feature `LaplaceXY` names the capability stub; every
//! constructor reports the missing backend.

#![cfg(not(feature = "krylov"))]

use laplace_xy::{CellLoc, KError, LaplaceXY, LaplaceXyConfig, MockMesh, Options};

#[test]
fn new_reports_missing_backend() {
    let mesh = MockMesh::new(5, 1);
    let err = LaplaceXY::new(&mesh, None, CellLoc::Centre).err().unwrap();
    assert!(matches!(err, KError::Capability(_)), "{err}");
}

#[test]
fn options_do_not_change_the_outcome() {
    let mesh = MockMesh::new(5, 1).with_y_guards(1);
    let opts = Options::new().with("ksptype", "cg").with("pctype", "jacobi");
    let err = LaplaceXY::new(&mesh, Some(&opts), CellLoc::XLow).err().unwrap();
    assert!(matches!(err, KError::Capability(_)), "{err}");
}

#[test]
fn with_config_reports_missing_backend() {
    let mesh = MockMesh::new(5, 1);
    let err = LaplaceXY::with_config(&mesh, LaplaceXyConfig::default(), CellLoc::Centre)
        .err()
        .unwrap();
    assert!(matches!(err, KError::Capability(_)), "{err}");
}
