use crate::error::GeodesicError;

/// Reference ellipsoid parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    /// Equatorial radius (metres)
    pub a: f64,
    /// Flattening (dimensionless)
    pub f: f64,
    /// Polar semi-axis: a * (1 - f)
    pub b: f64,
    /// First eccentricity squared: f * (2 - f)
    pub e2: f64,
    /// Second eccentricity squared: e^2 / (1 - f)^2
    pub ep2: f64,
    /// Third flattening: f / (2 - f)
    pub n: f64,
}

impl Ellipsoid {
    /// Build an ellipsoid without checking the parameters. Intended for presets.
    pub const fn new(a: f64, f: f64) -> Self {
        let f1 = 1.0 - f;
        let e2 = f * (2.0 - f);
        Self {
            a,
            f,
            b: a * f1,
            e2,
            ep2: e2 / (f1 * f1),
            n: f / (2.0 - f),
        }
    }

    /// Build an ellipsoid, rejecting parameters that would corrupt later results.
    ///
    /// `a` must be finite and positive; `f` must be finite and lie in (-1, 1).
    pub fn validated(a: f64, f: f64) -> Result<Self, GeodesicError> {
        if !(a.is_finite() && a > 0.0) {
            return Err(GeodesicError::InvalidEllipsoid(format!(
                "equatorial radius must be finite and positive, got {a}"
            )));
        }
        if !(f.is_finite() && f > -1.0 && f < 1.0) {
            return Err(GeodesicError::InvalidEllipsoid(format!(
                "flattening must be finite and within (-1, 1), got {f}"
            )));
        }
        Ok(Self::new(a, f))
    }

    /// First eccentricity (computed at runtime).
    pub fn eccentricity(&self) -> f64 {
        self.e2.abs().sqrt()
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        WGS84
    }
}

pub const WGS84: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_223_563);
pub const GRS80: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_222_101);
