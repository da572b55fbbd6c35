//! Ellipsoidal gnomonic projection.
//!
//! Geodesics through the centre map to straight lines on the tangent plane.
//! The forward direction is closed form given one inverse geodesic query:
//! the radial distance is `m12 / M12` along the azimuth at the centre. The
//! reverse direction walks the geodesic leaving the centre at the azimuth of
//! `(x, y)` and solves for the arclength with Newton's method.
//!
//! Following Karney, "Algorithms for geodesics" (J. Geodesy, 2013), section 8.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::capabilities::Mask;
use crate::error::ProjError;
use crate::geodesic::geomath;
use crate::geodesic::{Geodesic, GeodesicData, GeodesicEngine, GeodesicPath};
use crate::proj::ellipsoid::Ellipsoid;
use crate::proj::Projection;

/// Maximum number of position queries made by [`Gnomonic::reverse`].
pub const NUM_IT: usize = 10;

/// Convergence tolerance of the reverse solver, relative to `a`.
///
/// `0.01 * sqrt(f64::EPSILON)`; the square root of 2^-52 is exactly 2^-26.
pub const EPS: f64 = 0.01 * 1.490_116_119_384_765_6e-8;

/// Result of one forward or reverse projection.
///
/// `None` marks a value the projection could not produce: planar
/// coordinates for points outside the gnomonic domain, geographic ones when
/// the reverse solver fails to converge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GnomonicData {
    /// Latitude of the centre (degrees).
    pub lat0: f64,
    /// Longitude of the centre (degrees).
    pub lon0: f64,
    /// Latitude of the point (degrees).
    pub lat: Option<f64>,
    /// Longitude of the point (degrees).
    pub lon: Option<f64>,
    /// Easting (metres).
    pub x: Option<f64>,
    /// Northing (metres).
    pub y: Option<f64>,
    /// Azimuth of the geodesic through the centre, measured at the point (degrees).
    pub azi: Option<f64>,
    /// Reciprocal of the azimuthal scale at the point.
    pub rk: Option<f64>,
}

impl GnomonicData {
    /// `(x, y)` when both are defined.
    pub fn planar(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }

    /// `(lat, lon)` when both are defined.
    pub fn geographic(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

/// Gnomonic projection about any centre, backed by a geodesic engine.
#[derive(Clone, Debug)]
pub struct Gnomonic<E: GeodesicEngine = Geodesic> {
    engine: E,
    a: f64,
    f: f64,
}

impl Gnomonic<Geodesic> {
    /// Gnomonic projection on the WGS84 ellipsoid.
    pub fn wgs84() -> Self {
        Self::new(Geodesic::wgs84())
    }
}

impl<E: GeodesicEngine> Gnomonic<E> {
    pub fn new(engine: E) -> Self {
        let a = engine.equatorial_radius();
        let f = engine.flattening();
        Self { engine, a, f }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn equatorial_radius(&self) -> f64 {
        self.a
    }

    pub fn flattening(&self) -> f64 {
        self.f
    }

    /// Project `(lat, lon)` onto the plane tangent at `(lat0, lon0)`.
    ///
    /// `x` and `y` are `None` when the point is at or beyond the limiting
    /// radius (`M12 <= 0`); `azi` and `rk` are filled regardless.
    pub fn forward(&self, lat0: f64, lon0: f64, lat: f64, lon: f64) -> GnomonicData {
        let inv = self.engine.inverse_with_capabilities(
            lat0,
            lon0,
            lat,
            lon,
            Mask::AZIMUTH | Mask::GEODESIC_SCALE | Mask::REDUCED_LENGTH,
        );

        let mut data = GnomonicData {
            lat0,
            lon0,
            lat: Some(lat),
            lon: Some(lon),
            x: None,
            y: None,
            azi: Some(inv.azi2),
            rk: Some(inv.scale12),
        };

        if inv.scale12 > 0.0 {
            let rho = inv.m12 / inv.scale12;
            let (sx, cy) = geomath::sincosd(inv.azi1);
            data.x = Some(rho * sx);
            data.y = Some(rho * cy);
        } else {
            trace!(
                lat0,
                lon0,
                lat,
                lon,
                scale12 = inv.scale12,
                "Point outside gnomonic domain"
            );
        }
        data
    }

    /// Recover the geographic point whose projection about `(lat0, lon0)` is `(x, y)`.
    ///
    /// Makes at most [`NUM_IT`] position queries. Once a correction falls
    /// below `EPS * a` one more query is made so the reported point reflects
    /// the corrected arclength, budget permitting; a tolerance met on the
    /// last query reports that query's sample. If the tolerance is never met
    /// the geographic fields are `None`.
    pub fn reverse(&self, lat0: f64, lon0: f64, x: f64, y: f64) -> GnomonicData {
        let mut data = GnomonicData {
            lat0,
            lon0,
            lat: None,
            lon: None,
            x: Some(x),
            y: Some(y),
            azi: None,
            rk: None,
        };

        let azi0 = geomath::atan2d(x, y);
        let mut rho = x.hypot(y);
        let mut s = self.a * (rho / self.a).atan();
        let little = rho <= self.a;
        if !little {
            rho = 1.0 / rho;
        }

        let caps = Mask::LATITUDE
            | Mask::LONGITUDE
            | Mask::AZIMUTH
            | Mask::DISTANCE_IN
            | Mask::REDUCED_LENGTH
            | Mask::GEODESIC_SCALE;
        let line = self.engine.line_with_capabilities(lat0, lon0, azi0, caps);

        let mut trip = false;
        let mut pos = GeodesicData::undefined(lat0, lon0);
        for iteration in 1..=NUM_IT {
            pos = line.position_with_capabilities(s, caps);
            if trip {
                break;
            }

            let ds = if little {
                (pos.m12 / pos.scale12 - rho) * pos.scale12 * pos.scale12
            } else {
                (rho - pos.scale12 / pos.m12) * pos.m12 * pos.m12
            };
            s -= ds;
            trace!(iteration, s, ds, little, "Gnomonic reverse step");

            // Written so that a NaN correction never trips.
            if ds.abs() <= EPS * self.a {
                trip = true;
            }
        }

        if trip {
            data.lat = Some(pos.lat2);
            data.lon = Some(pos.lon2);
            data.azi = Some(pos.azi2);
            data.rk = Some(pos.scale12);
            return data;
        }

        debug!(
            lat0,
            lon0,
            x,
            y,
            iterations = NUM_IT,
            "Gnomonic reverse did not converge"
        );
        data
    }
}

/// Gnomonic projection with a fixed centre, usable through [`Projection`].
///
/// Angles at this interface are in radians, like the other projections.
#[derive(Clone, Debug)]
pub struct ObliqueGnomonic<E: GeodesicEngine = Geodesic> {
    gnomonic: Gnomonic<E>,
    ellipsoid: Ellipsoid,
    // Centre, degrees
    lat0: f64,
    lon0: f64,
}

impl ObliqueGnomonic<Geodesic> {
    /// Centre given as `(lon0, lat0)` in radians.
    pub fn new(ellipsoid: Ellipsoid, lon0: f64, lat0: f64) -> Result<Self, ProjError> {
        Self::with_engine(Geodesic::from_ellipsoid(ellipsoid)?, lon0, lat0)
    }
}

impl<E: GeodesicEngine> ObliqueGnomonic<E> {
    /// Centre given as `(lon0, lat0)` in radians.
    pub fn with_engine(engine: E, lon0: f64, lat0: f64) -> Result<Self, ProjError> {
        if !lon0.is_finite() {
            return Err(ProjError::InvalidParameter(format!(
                "central longitude must be finite, got {lon0}"
            )));
        }
        let lat0_deg = lat0.to_degrees();
        if !(lat0_deg.abs() <= 90.0) {
            return Err(ProjError::InvalidParameter(format!(
                "central latitude must lie within [-90, 90] degrees, got {lat0_deg}"
            )));
        }
        let ellipsoid = Ellipsoid::validated(engine.equatorial_radius(), engine.flattening())?;
        Ok(Self {
            gnomonic: Gnomonic::new(engine),
            ellipsoid,
            lat0: lat0_deg,
            lon0: lon0.to_degrees(),
        })
    }

    pub fn gnomonic(&self) -> &Gnomonic<E> {
        &self.gnomonic
    }
}

impl<E: GeodesicEngine> Projection for ObliqueGnomonic<E> {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let (lon_deg, lat_deg) = (lon.to_degrees(), lat.to_degrees());
        self.gnomonic
            .forward(self.lat0, self.lon0, lat_deg, lon_deg)
            .planar()
            .ok_or_else(|| ProjError::OutsideDomain(format!("lon={lon_deg}, lat={lat_deg}")))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let (lat, lon) = self
            .gnomonic
            .reverse(self.lat0, self.lon0, x, y)
            .geographic()
            .ok_or(ProjError::NoConvergence { iterations: NUM_IT })?;
        Ok((lon.to_radians(), lat.to_radians()))
    }

    fn forward_batch(&self, coords: &mut [(f64, f64)]) -> Result<(), ProjError> {
        coords.par_iter_mut().try_for_each(|c| {
            *c = self.forward(c.0, c.1)?;
            Ok(())
        })
    }

    fn inverse_batch(&self, coords: &mut [(f64, f64)]) -> Result<(), ProjError> {
        coords.par_iter_mut().try_for_each(|c| {
            *c = self.inverse(c.0, c.1)?;
            Ok(())
        })
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::geodesic::GeodesicLine;
    use crate::proj::ellipsoid::WGS84;

    /// Wraps the real engine and counts position queries.
    struct CountingEngine {
        inner: Geodesic,
        queries: Arc<AtomicUsize>,
    }

    struct CountingLine {
        inner: GeodesicLine,
        queries: Arc<AtomicUsize>,
    }

    impl GeodesicPath for CountingLine {
        fn position_with_capabilities(&self, s12: f64, caps: Mask) -> GeodesicData {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.position_with_capabilities(s12, caps)
        }
    }

    impl GeodesicEngine for CountingEngine {
        type Line = CountingLine;

        fn equatorial_radius(&self) -> f64 {
            self.inner.equatorial_radius()
        }

        fn flattening(&self) -> f64 {
            self.inner.flattening()
        }

        fn inverse_with_capabilities(
            &self,
            lat1: f64,
            lon1: f64,
            lat2: f64,
            lon2: f64,
            caps: Mask,
        ) -> GeodesicData {
            self.inner.inverse_with_capabilities(lat1, lon1, lat2, lon2, caps)
        }

        fn line_with_capabilities(
            &self,
            lat1: f64,
            lon1: f64,
            azi1: f64,
            caps: Mask,
        ) -> CountingLine {
            CountingLine {
                inner: self.inner.line_with_capabilities(lat1, lon1, azi1, caps),
                queries: Arc::clone(&self.queries),
            }
        }
    }

    /// A spherical stand-in that reports the queried arclength as `lat2` and
    /// records every query. Its lines run on a sphere 5% larger than the
    /// advertised radius so the initial guess is off. `broken` makes it
    /// return a NaN reduced length.
    struct ScriptedEngine {
        radius: f64,
        broken: bool,
        queried: Arc<Mutex<Vec<f64>>>,
    }

    struct ScriptedLine {
        radius: f64,
        broken: bool,
        queried: Arc<Mutex<Vec<f64>>>,
    }

    impl GeodesicPath for ScriptedLine {
        fn position_with_capabilities(&self, s12: f64, _caps: Mask) -> GeodesicData {
            self.queried.lock().unwrap().push(s12);
            let sigma = s12 / self.radius;
            let mut data = GeodesicData::undefined(0.0, 0.0);
            data.lat2 = s12;
            data.lon2 = 0.0;
            data.azi2 = 0.0;
            data.m12 = if self.broken {
                f64::NAN
            } else {
                self.radius * sigma.sin()
            };
            data.scale12 = sigma.cos();
            data
        }
    }

    impl GeodesicEngine for ScriptedEngine {
        type Line = ScriptedLine;

        fn equatorial_radius(&self) -> f64 {
            self.radius
        }

        fn flattening(&self) -> f64 {
            0.0
        }

        fn inverse_with_capabilities(
            &self,
            lat1: f64,
            lon1: f64,
            _lat2: f64,
            _lon2: f64,
            _caps: Mask,
        ) -> GeodesicData {
            GeodesicData::undefined(lat1, lon1)
        }

        fn line_with_capabilities(
            &self,
            _lat1: f64,
            _lon1: f64,
            _azi1: f64,
            _caps: Mask,
        ) -> ScriptedLine {
            ScriptedLine {
                radius: 1.05 * self.radius,
                broken: self.broken,
                queried: Arc::clone(&self.queried),
            }
        }
    }

    fn scripted(broken: bool) -> (Gnomonic<ScriptedEngine>, Arc<Mutex<Vec<f64>>>) {
        let queried = Arc::new(Mutex::new(Vec::new()));
        let engine = ScriptedEngine {
            radius: 6_371_000.0,
            broken,
            queried: Arc::clone(&queried),
        };
        (Gnomonic::new(engine), queried)
    }

    /// Lines whose reduced length only matches the target on query
    /// `NUM_IT`. Each sample reports its query number as `lat2`.
    struct LateTripEngine {
        queries: Arc<AtomicUsize>,
    }

    struct LateTripLine {
        queries: Arc<AtomicUsize>,
    }

    impl GeodesicPath for LateTripLine {
        fn position_with_capabilities(&self, _s12: f64, _caps: Mask) -> GeodesicData {
            let n = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
            let mut data = GeodesicData::undefined(0.0, 0.0);
            data.lat2 = n as f64;
            data.lon2 = 0.0;
            data.azi2 = 0.0;
            data.m12 = if n < NUM_IT { 1.0e6 } else { 1000.0 };
            data.scale12 = 1.0;
            data
        }
    }

    impl GeodesicEngine for LateTripEngine {
        type Line = LateTripLine;

        fn equatorial_radius(&self) -> f64 {
            6_371_000.0
        }

        fn flattening(&self) -> f64 {
            0.0
        }

        fn inverse_with_capabilities(
            &self,
            lat1: f64,
            lon1: f64,
            _lat2: f64,
            _lon2: f64,
            _caps: Mask,
        ) -> GeodesicData {
            GeodesicData::undefined(lat1, lon1)
        }

        fn line_with_capabilities(
            &self,
            _lat1: f64,
            _lon1: f64,
            _azi1: f64,
            _caps: Mask,
        ) -> LateTripLine {
            LateTripLine {
                queries: Arc::clone(&self.queries),
            }
        }
    }

    #[test]
    fn test_eps_value() {
        assert_eq!(EPS, 0.01 * f64::EPSILON.sqrt());
    }

    #[test]
    fn test_center_is_fixed_point() {
        let g = Gnomonic::wgs84();
        let fwd = g.forward(45.0, 10.0, 45.0, 10.0);
        assert_eq!(fwd.planar(), Some((0.0, 0.0)));
        assert_abs_diff_eq!(fwd.rk.unwrap(), 1.0, epsilon = 1e-15);

        let rev = g.reverse(45.0, 10.0, 0.0, 0.0);
        let (lat, lon) = rev.geographic().unwrap();
        assert_abs_diff_eq!(lat, 45.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lon, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_equatorial_scenario() {
        let g = Gnomonic::wgs84();
        let fwd = g.forward(0.0, 0.0, 0.0, 1.0);
        let (x, y) = fwd.planar().unwrap();
        // On the equator rho = b tan(lambda / (1 - f)).
        let expected = WGS84.b * (1.0_f64.to_radians() / (1.0 - WGS84.f)).tan();
        assert_relative_eq!(x, expected, max_relative = 1e-12);
        assert!((x - 111_319.5).abs() < 50.0);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fwd.azi.unwrap(), 90.0, epsilon = 1e-12);

        let rev = g.reverse(0.0, 0.0, x, y);
        let (lat, lon) = rev.geographic().unwrap();
        assert_abs_diff_eq!(lat, 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(lon, 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(rev.azi.unwrap(), 90.0, epsilon = 1e-8);
    }

    #[test]
    fn test_round_trip() {
        let g = Gnomonic::wgs84();
        let cases = [
            (0.0, 0.0, 30.0, 40.0),
            (48.85, 2.35, 51.5, -0.12),
            (-33.9, 151.2, -41.3, 174.8),
            (60.0, -100.0, 20.0, -80.0),
            (89.0, 0.0, 60.0, 120.0),
            (10.0, 170.0, 5.0, -170.0),
        ];
        for (lat0, lon0, lat, lon) in cases {
            let fwd = g.forward(lat0, lon0, lat, lon);
            let (x, y) = fwd.planar().unwrap();
            let rev = g.reverse(lat0, lon0, x, y);
            let (lat_r, lon_r) = rev.geographic().unwrap();
            assert_abs_diff_eq!(lat_r, lat, epsilon = 1e-8);
            assert_abs_diff_eq!(lon_r, lon, epsilon = 1e-8);
            assert_abs_diff_eq!(rev.azi.unwrap(), fwd.azi.unwrap(), epsilon = 1e-8);
            assert_relative_eq!(rev.rk.unwrap(), fwd.rk.unwrap(), max_relative = 1e-8);
        }
    }

    #[test]
    fn test_round_trip_beyond_one_radius() {
        // 75 degrees away the radial distance exceeds a.
        let g = Gnomonic::wgs84();
        let fwd = g.forward(0.0, 0.0, 0.0, 75.0);
        let (x, y) = fwd.planar().unwrap();
        assert!(x.hypot(y) > WGS84.a);
        let (lat, lon) = g.reverse(0.0, 0.0, x, y).geographic().unwrap();
        assert_abs_diff_eq!(lat, 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(lon, 75.0, epsilon = 1e-8);
    }

    #[test]
    fn test_antipode_is_outside_domain() {
        let g = Gnomonic::wgs84();
        let fwd = g.forward(0.0, 0.0, 0.0, 180.0);
        assert!(fwd.x.is_none());
        assert!(fwd.y.is_none());
        assert!(fwd.planar().is_none());
        assert!(fwd.azi.unwrap().is_finite());
        assert!(fwd.rk.unwrap().is_finite());
        assert!(fwd.rk.unwrap() <= 0.0);

        // Anything more than a quarter circle away is beyond the horizon.
        let fwd = g.forward(30.0, 0.0, -70.0, 30.0);
        assert!(fwd.planar().is_none());
    }

    #[test]
    fn test_regime_boundary_is_continuous() {
        let g = Gnomonic::wgs84();
        let a = WGS84.a;
        let (sx, cy) = geomath::sincosd(35.0);
        let inside = g.reverse(20.0, 30.0, a * (1.0 - 1e-9) * sx, a * (1.0 - 1e-9) * cy);
        let at = g.reverse(20.0, 30.0, a * sx, a * cy);
        let outside = g.reverse(20.0, 30.0, a * (1.0 + 1e-9) * sx, a * (1.0 + 1e-9) * cy);
        let (lat_i, lon_i) = inside.geographic().unwrap();
        let (lat_a, lon_a) = at.geographic().unwrap();
        let (lat_o, lon_o) = outside.geographic().unwrap();
        assert_abs_diff_eq!(lat_i, lat_a, epsilon = 1e-6);
        assert_abs_diff_eq!(lon_i, lon_a, epsilon = 1e-6);
        assert_abs_diff_eq!(lat_o, lat_a, epsilon = 1e-6);
        assert_abs_diff_eq!(lon_o, lon_a, epsilon = 1e-6);
    }

    #[test]
    fn test_reverse_query_budget() {
        let queries = Arc::new(AtomicUsize::new(0));
        let g = Gnomonic::new(CountingEngine {
            inner: Geodesic::wgs84(),
            queries: Arc::clone(&queries),
        });
        let inputs = [
            (0.0, 0.0, 0.0, 0.0),
            (10.0, 20.0, 1.0e5, -2.0e5),
            (-45.0, 100.0, 6.0e6, 6.0e6),
            (80.0, -30.0, 5.0e7, 1.0e7),
            (0.0, 0.0, 1.0e30, 0.0),
            (0.0, 0.0, f64::NAN, 1.0),
        ];
        for (lat0, lon0, x, y) in inputs {
            queries.store(0, Ordering::SeqCst);
            g.reverse(lat0, lon0, x, y);
            let used = queries.load(Ordering::SeqCst);
            assert!(used >= 1 && used <= NUM_IT, "{used} queries for ({x}, {y})");
        }
    }

    #[test]
    fn test_non_convergence_leaves_geographic_undefined() {
        let (g, queried) = scripted(true);
        let rev = g.reverse(12.0, 34.0, 1000.0, 2000.0);
        assert_eq!(queried.lock().unwrap().len(), NUM_IT);
        assert!(rev.geographic().is_none());
        assert!(rev.azi.is_none());
        assert!(rev.rk.is_none());
        assert_eq!(rev.planar(), Some((1000.0, 2000.0)));
        assert_eq!((rev.lat0, rev.lon0), (12.0, 34.0));
    }

    #[test]
    fn test_reports_sample_after_converging_correction() {
        let (g, queried) = scripted(false);
        let rev = g.reverse(0.0, 0.0, 3.0e6, 4.0e6);
        let queried = queried.lock().unwrap().clone();
        let n = queried.len();
        assert!(n >= 3 && n <= NUM_IT);

        // The reported sample is the query made after the tripping correction.
        assert_eq!(rev.lat, Some(queried[n - 1]));
        let tol = EPS * g.equatorial_radius();
        assert!((queried[n - 1] - queried[n - 2]).abs() <= tol);
        assert!((queried[n - 2] - queried[n - 3]).abs() > tol);

        // On a sphere the gnomonic radius is R tan(s / R).
        let radius = 1.05 * g.equatorial_radius();
        assert_relative_eq!(
            radius * (queried[n - 1] / radius).tan(),
            5.0e6,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_tolerance_met_on_last_query_reports_it() {
        let queries = Arc::new(AtomicUsize::new(0));
        let g = Gnomonic::new(LateTripEngine {
            queries: Arc::clone(&queries),
        });
        let rev = g.reverse(0.0, 0.0, 1000.0, 0.0);
        assert_eq!(queries.load(Ordering::SeqCst), NUM_IT);
        assert_eq!(rev.lat, Some(NUM_IT as f64));
        assert_eq!(rev.geographic(), Some((NUM_IT as f64, 0.0)));
        assert_eq!(rev.azi, Some(0.0));
        assert_eq!(rev.rk, Some(1.0));
        assert_eq!(rev.planar(), Some((1000.0, 0.0)));
    }

    #[test]
    fn test_oblique_adapter_errors() {
        let p = ObliqueGnomonic::new(WGS84, 0.0, 0.0).unwrap();
        let err = p.forward(std::f64::consts::PI, 0.0).unwrap_err();
        assert!(matches!(err, ProjError::OutsideDomain(_)));

        let broken = ObliqueGnomonic::with_engine(scripted(true).0.engine, 0.0, 0.0).unwrap();
        let err = broken.inverse(1000.0, 1000.0).unwrap_err();
        assert_eq!(err, ProjError::NoConvergence { iterations: NUM_IT });

        let bad = Ellipsoid::new(6_378_137.0, 1.0);
        assert!(matches!(
            ObliqueGnomonic::new(bad, 0.0, 0.0),
            Err(ProjError::Geodesic(_))
        ));
        assert!(matches!(
            ObliqueGnomonic::new(WGS84, 0.0, 2.0),
            Err(ProjError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_oblique_adapter_round_trip() {
        let p = ObliqueGnomonic::new(WGS84, 2.35_f64.to_radians(), 48.85_f64.to_radians()).unwrap();
        let (lon, lat) = (13.4_f64.to_radians(), 52.5_f64.to_radians());
        let (x, y) = p.forward(lon, lat).unwrap();
        let (lon_r, lat_r) = p.inverse(x, y).unwrap();
        assert_relative_eq!(lon_r, lon, epsilon = 1e-10);
        assert_relative_eq!(lat_r, lat, epsilon = 1e-10);
        assert_eq!(p.ellipsoid(), &WGS84);
    }

    #[test]
    fn test_batch_matches_serial() {
        let p = ObliqueGnomonic::new(WGS84, 0.3, 0.7).unwrap();
        let points: Vec<(f64, f64)> = (0..64)
            .map(|i| {
                let t = i as f64 / 64.0;
                (0.3 + 0.4 * (t - 0.5), 0.7 + 0.3 * (0.5 - t))
            })
            .collect();

        let serial: Vec<(f64, f64)> = points
            .iter()
            .map(|&(lon, lat)| p.forward(lon, lat).unwrap())
            .collect();
        let mut batch = points.clone();
        p.forward_batch(&mut batch).unwrap();
        assert_eq!(batch, serial);

        let serial_inv: Vec<(f64, f64)> =
            serial.iter().map(|&(x, y)| p.inverse(x, y).unwrap()).collect();
        p.inverse_batch(&mut batch).unwrap();
        assert_eq!(batch, serial_inv);
        for (got, want) in batch.iter().zip(&points) {
            assert_abs_diff_eq!(got.0, want.0, epsilon = 1e-10);
            assert_abs_diff_eq!(got.1, want.1, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_batch_reports_first_failure() {
        let p = ObliqueGnomonic::new(WGS84, 0.0, 0.0).unwrap();
        let mut coords = vec![(0.1, 0.1), (std::f64::consts::PI, 0.0), (0.2, -0.1)];
        assert!(matches!(
            p.forward_batch(&mut coords),
            Err(ProjError::OutsideDomain(_))
        ));
    }
}
