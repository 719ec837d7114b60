//! Settings of one X-Y inversion, read from the `laplacexy` options section.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::options::Options;
use crate::error::KError;

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($name::$variant => $text),+
                })
            }
        }

        impl FromStr for $name {
            type Err = KError;
            fn from_str(s: &str) -> Result<Self, KError> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text $(| $alias)* => Ok($name::$variant),)+
                    other => Err(KError::config(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

named_enum!(
    /// Krylov method.
    KspType {
        Gmres => "gmres",
        Cg => "cg" | "pcg",
        Bicgstab => "bicgstab" | "bcgs",
        PreOnly => "preonly",
    }
);

named_enum!(
    /// Preconditioner applied to the process-local block.
    PcType {
        None => "none",
        Jacobi => "jacobi",
        Sor => "sor" | "ssor",
        Ilu => "ilu" | "ilu0",
        Lu => "lu",
        XLines => "xlines" | "bjacobi",
    }
);

named_enum!(
    /// Side on which GMRES applies the preconditioner.
    PcSide {
        Left => "left",
        Right => "right",
    }
);

named_enum!(
    /// How the coefficient `A` is averaged onto cell faces.
    FaceAveraging {
        Arithmetic => "arithmetic",
        Harmonic => "harmonic",
    }
);

impl FaceAveraging {
    /// Face value of `A` between two neighbouring points.
    pub fn average(self, a: f64, b: f64) -> f64 {
        match self {
            FaceAveraging::Arithmetic => 0.5 * (a + b),
            FaceAveraging::Harmonic => {
                let s = a + b;
                if s == 0.0 { 0.0 } else { 2.0 * a * b / s }
            }
        }
    }
}

bitflags! {
    /// Boundaries carrying Dirichlet rows; unset boundaries get
    /// zero-gradient (Neumann) rows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirichletBoundaries: u8 {
        const INNER_X = 0b001;
        const OUTER_X = 0b010;
        const Y       = 0b100;
    }
}

/// Typed `laplacexy` options. Missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaplaceXyConfig {
    pub ksptype: KspType,
    pub pctype: PcType,
    pub pcside: PcSide,
    pub rtol: f64,
    pub atol: f64,
    pub dtol: f64,
    pub maxits: usize,
    pub restart: usize,
    pub sor_omega: f64,
    pub sor_its: usize,
    pub include_y_derivs: bool,
    pub x_inner_dirichlet: bool,
    pub x_outer_dirichlet: bool,
    pub y_bndry_dirichlet: bool,
    pub averaging: FaceAveraging,
    /// Log the residual every this many iterations; 0 disables.
    pub monitor_interval: usize,
    /// Size of the Rayon pool; 0 = all cores, unset = leave the pool alone.
    pub threads: Option<usize>,
}

impl Default for LaplaceXyConfig {
    fn default() -> Self {
        Self {
            ksptype: KspType::Gmres,
            pctype: PcType::Ilu,
            pcside: PcSide::Right,
            rtol: 1e-5,
            atol: 1e-10,
            dtol: 1e3,
            maxits: 100_000,
            restart: 30,
            sor_omega: 1.0,
            sor_its: 1,
            include_y_derivs: true,
            x_inner_dirichlet: false,
            x_outer_dirichlet: false,
            y_bndry_dirichlet: false,
            averaging: FaceAveraging::Arithmetic,
            monitor_interval: 0,
            threads: None,
        }
    }
}

impl LaplaceXyConfig {
    pub const KEYS: [&'static str; 17] = [
        "ksptype",
        "pctype",
        "pcside",
        "rtol",
        "atol",
        "dtol",
        "maxits",
        "restart",
        "sor_omega",
        "sor_its",
        "include_y_derivs",
        "x_inner_dirichlet",
        "x_outer_dirichlet",
        "y_bndry_dirichlet",
        "averaging",
        "monitor_interval",
        "threads",
    ];

    /// Read and validate a `laplacexy` section. `None` yields the defaults.
    pub fn from_options(opts: Option<&Options>) -> Result<Self, KError> {
        let d = Self::default();
        let Some(o) = opts else {
            return Ok(d);
        };
        for key in o.keys().filter(|k| !Self::KEYS.contains(k)) {
            log::warn!("laplacexy: option '{key}' is not used");
        }
        let cfg = Self {
            ksptype: o.get_or("ksptype", d.ksptype)?,
            pctype: o.get_or("pctype", d.pctype)?,
            pcside: o.get_or("pcside", d.pcside)?,
            rtol: o.get_or("rtol", d.rtol)?,
            atol: o.get_or("atol", d.atol)?,
            dtol: o.get_or("dtol", d.dtol)?,
            maxits: o.get_or("maxits", d.maxits)?,
            restart: o.get_or("restart", d.restart)?,
            sor_omega: o.get_or("sor_omega", d.sor_omega)?,
            sor_its: o.get_or("sor_its", d.sor_its)?,
            include_y_derivs: o.get_bool("include_y_derivs")?.unwrap_or(d.include_y_derivs),
            x_inner_dirichlet: o.get_bool("x_inner_dirichlet")?.unwrap_or(d.x_inner_dirichlet),
            x_outer_dirichlet: o.get_bool("x_outer_dirichlet")?.unwrap_or(d.x_outer_dirichlet),
            y_bndry_dirichlet: o.get_bool("y_bndry_dirichlet")?.unwrap_or(d.y_bndry_dirichlet),
            averaging: o.get_or("averaging", d.averaging)?,
            monitor_interval: o.get_or("monitor_interval", d.monitor_interval)?,
            threads: o.get("threads")?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), KError> {
        for (name, v) in [("rtol", self.rtol), ("atol", self.atol), ("dtol", self.dtol)] {
            if !v.is_finite() || v < 0.0 {
                return Err(KError::config(format!("{name} must be finite and non-negative, got {v}")));
            }
        }
        if self.maxits == 0 {
            return Err(KError::config("maxits must be positive"));
        }
        if self.restart == 0 {
            return Err(KError::config("restart must be positive"));
        }
        if !(self.sor_omega > 0.0 && self.sor_omega < 2.0) {
            return Err(KError::config(format!("sor_omega must lie in (0, 2), got {}", self.sor_omega)));
        }
        if self.sor_its == 0 {
            return Err(KError::config("sor_its must be positive"));
        }
        Ok(())
    }

    pub fn dirichlet(&self) -> DirichletBoundaries {
        let mut d = DirichletBoundaries::empty();
        d.set(DirichletBoundaries::INNER_X, self.x_inner_dirichlet);
        d.set(DirichletBoundaries::OUTER_X, self.x_outer_dirichlet);
        d.set(DirichletBoundaries::Y, self.y_bndry_dirichlet);
        d
    }

    /// Builder for the three boundary flags at once.
    pub fn with_dirichlet(mut self, d: DirichletBoundaries) -> Self {
        self.x_inner_dirichlet = d.contains(DirichletBoundaries::INNER_X);
        self.x_outer_dirichlet = d.contains(DirichletBoundaries::OUTER_X);
        self.y_bndry_dirichlet = d.contains(DirichletBoundaries::Y);
        self
    }

    /// The same settings as an option section, e.g. to pass through
    /// [`Options`]-based constructors.
    pub fn to_options(&self) -> Options {
        let mut o = Options::new();
        o.set("ksptype", self.ksptype)
            .set("pctype", self.pctype)
            .set("pcside", self.pcside)
            .set("rtol", self.rtol)
            .set("atol", self.atol)
            .set("dtol", self.dtol)
            .set("maxits", self.maxits)
            .set("restart", self.restart)
            .set("sor_omega", self.sor_omega)
            .set("sor_its", self.sor_its)
            .set("include_y_derivs", self.include_y_derivs)
            .set("x_inner_dirichlet", self.x_inner_dirichlet)
            .set("x_outer_dirichlet", self.x_outer_dirichlet)
            .set("y_bndry_dirichlet", self.y_bndry_dirichlet)
            .set("averaging", self.averaging)
            .set("monitor_interval", self.monitor_interval);
        if let Some(t) = self.threads {
            o.set("threads", t);
        }
        o
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_options() {
        let c = LaplaceXyConfig::from_options(None).unwrap();
        assert_eq!(c, LaplaceXyConfig::default());
        assert_eq!(c.ksptype, KspType::Gmres);
        assert!(c.include_y_derivs);
        assert!(c.dirichlet().is_empty());
    }

    #[test]
    fn parses_section() {
        let o = Options::new()
            .with("ksptype", "bcgs")
            .with("pctype", "SOR")
            .with("sor_omega", 1.5)
            .with("include_y_derivs", "off")
            .with("x_inner_dirichlet", true)
            .with("y_bndry_dirichlet", "yes")
            .with("averaging", "harmonic");
        let c = LaplaceXyConfig::from_options(Some(&o)).unwrap();
        assert_eq!(c.ksptype, KspType::Bicgstab);
        assert_eq!(c.pctype, PcType::Sor);
        assert_eq!(c.sor_omega, 1.5);
        assert!(!c.include_y_derivs);
        assert_eq!(c.dirichlet(), DirichletBoundaries::INNER_X | DirichletBoundaries::Y);
        assert_eq!(c.averaging, FaceAveraging::Harmonic);
    }

    #[test]
    fn rejects_bad_values() {
        for (k, v) in [("pctype", "amg"), ("rtol", "-1"), ("maxits", "0"), ("sor_omega", "2.0"), ("pcside", "up")] {
            let o = Options::new().with(k, v);
            assert!(
                matches!(LaplaceXyConfig::from_options(Some(&o)), Err(KError::Configuration(_))),
                "{k} = {v} accepted"
            );
        }
    }

    #[test]
    fn options_round_trip() {
        let c = LaplaceXyConfig {
            pctype: PcType::XLines,
            threads: Some(2),
            ..Default::default()
        }
        .with_dirichlet(DirichletBoundaries::all());
        assert_eq!(LaplaceXyConfig::from_options(Some(&c.to_options())).unwrap(), c);
    }

    #[test]
    fn serde_uses_defaults_for_missing_fields() {
        let c: LaplaceXyConfig = serde_json::from_str(r#"{"pctype": "lu", "maxits": 7}"#).unwrap();
        assert_eq!(c.pctype, PcType::Lu);
        assert_eq!(c.maxits, 7);
        assert_eq!(c.restart, 30);
    }

    #[test]
    fn face_averages() {
        assert_eq!(FaceAveraging::Arithmetic.average(1.0, 3.0), 2.0);
        assert_eq!(FaceAveraging::Harmonic.average(1.0, 3.0), 1.5);
        assert_eq!(FaceAveraging::Harmonic.average(0.0, 0.0), 0.0);
    }
}
