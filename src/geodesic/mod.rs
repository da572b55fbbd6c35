//! Ellipsoidal geodesics: the engine traits the projections are written
//! against, and a series-expansion engine implementing them.

pub mod engine;
pub mod geomath;
pub mod line;

pub use engine::Geodesic;
pub use line::GeodesicLine;

use crate::capabilities::Mask;

/// Order of the series expansions in the third flattening.
pub const GEODESIC_ORDER: usize = 6;

/// One observation from a geodesic query.
///
/// Only the fields named by the query's capability mask are guaranteed to be
/// populated; the others are NaN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeodesicData {
    /// Latitude of point 1 (degrees).
    pub lat1: f64,
    /// Longitude of point 1 (degrees).
    pub lon1: f64,
    /// Azimuth at point 1 (degrees).
    pub azi1: f64,
    /// Latitude of point 2 (degrees).
    pub lat2: f64,
    /// Longitude of point 2 (degrees).
    pub lon2: f64,
    /// Azimuth at point 2 (degrees).
    pub azi2: f64,
    /// Distance from point 1 to point 2 (metres).
    pub s12: f64,
    /// Arc length on the auxiliary sphere (degrees).
    pub a12: f64,
    /// Reduced length m12 (metres).
    pub m12: f64,
    /// Geodesic scale M12 of point 2 relative to point 1.
    pub scale12: f64,
    /// Geodesic scale M21 of point 1 relative to point 2.
    pub scale21: f64,
    /// Area S12 under the geodesic (square metres).
    pub area: f64,
}

impl GeodesicData {
    pub(crate) fn undefined(lat1: f64, lon1: f64) -> Self {
        Self {
            lat1,
            lon1,
            azi1: f64::NAN,
            lat2: f64::NAN,
            lon2: f64::NAN,
            azi2: f64::NAN,
            s12: f64::NAN,
            a12: f64::NAN,
            m12: f64::NAN,
            scale12: f64::NAN,
            scale21: f64::NAN,
            area: f64::NAN,
        }
    }
}

/// A geodesic fixed at a start point and azimuth that can be sampled by distance.
pub trait GeodesicPath: Send + Sync {
    /// Evaluate the geodesic at distance `s12` from its start point.
    fn position_with_capabilities(&self, s12: f64, caps: Mask) -> GeodesicData;
}

/// Anything that can solve inverse geodesic problems and build geodesic lines.
///
/// Implementations must be safe for concurrent read-only queries.
pub trait GeodesicEngine: Send + Sync {
    type Line: GeodesicPath;

    /// Equatorial radius `a` of the ellipsoid.
    fn equatorial_radius(&self) -> f64;

    /// Flattening `f` of the ellipsoid.
    fn flattening(&self) -> f64;

    /// Solve the inverse problem between two points (degrees).
    fn inverse_with_capabilities(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        caps: Mask,
    ) -> GeodesicData;

    /// Build a geodesic line from a start point and azimuth (degrees).
    fn line_with_capabilities(&self, lat1: f64, lon1: f64, azi1: f64, caps: Mask) -> Self::Line;
}

impl<E: GeodesicEngine + ?Sized> GeodesicEngine for &E {
    type Line = E::Line;

    fn equatorial_radius(&self) -> f64 {
        (**self).equatorial_radius()
    }

    fn flattening(&self) -> f64 {
        (**self).flattening()
    }

    fn inverse_with_capabilities(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        caps: Mask,
    ) -> GeodesicData {
        (**self).inverse_with_capabilities(lat1, lon1, lat2, lon2, caps)
    }

    fn line_with_capabilities(&self, lat1: f64, lon1: f64, azi1: f64, caps: Mask) -> Self::Line {
        (**self).line_with_capabilities(lat1, lon1, azi1, caps)
    }
}
