//! A geodesic fixed by its start point and azimuth.

#![allow(non_snake_case)]

use super::engine::{Geodesic, CARR_SIZE};
use super::geomath::{self, sq};
use super::{GeodesicData, GeodesicPath, GEODESIC_ORDER};
use crate::capabilities::Mask;

/// Precomputed state for sampling one geodesic by distance or arc length.
///
/// Only the series named in the construction mask are evaluated, so a line
/// built without `DISTANCE_IN` cannot answer distance queries.
#[derive(Clone, Debug)]
pub struct GeodesicLine {
    lat1: f64,
    lon1: f64,
    azi1: f64,
    caps: Mask,

    a: f64,
    f: f64,
    b: f64,
    c2: f64,
    f1: f64,
    tiny: f64,

    salp1: f64,
    calp1: f64,
    dn1: f64,
    salp0: f64,
    calp0: f64,
    ssig1: f64,
    csig1: f64,
    somg1: f64,
    comg1: f64,
    k2: f64,

    A1m1: f64,
    A2m1: f64,
    A3c: f64,
    A4: f64,
    B11: f64,
    B21: f64,
    B31: f64,
    B41: f64,
    stau1: f64,
    ctau1: f64,

    c1a: [f64; CARR_SIZE],
    c1pa: [f64; CARR_SIZE],
    c2a: [f64; CARR_SIZE],
    c3a: [f64; GEODESIC_ORDER],
    c4a: [f64; GEODESIC_ORDER],
}

impl GeodesicLine {
    pub fn new(geod: &Geodesic, lat1: f64, lon1: f64, azi1: f64, caps: Mask) -> Self {
        // Latitude and azimuth are always needed to anchor the line.
        let caps = caps | Mask::LATITUDE | Mask::AZIMUTH | Mask::LONG_UNROLL;
        let lat1 = geomath::lat_fix(lat1);
        let azi1 = geomath::ang_normalize(azi1);
        let (salp1, calp1) = geomath::sincosd(geomath::ang_round(azi1));

        let (mut sbet1, mut cbet1) = geomath::sincosd(geomath::ang_round(lat1));
        sbet1 *= geod.f1;
        geomath::norm(&mut sbet1, &mut cbet1);
        cbet1 = cbet1.max(geod.tiny);
        let dn1 = (1.0 + geod.ep2 * sq(sbet1)).sqrt();

        let salp0 = salp1 * cbet1;
        let calp0 = calp1.hypot(salp1 * sbet1);

        let mut ssig1 = sbet1;
        let somg1 = salp0 * sbet1;
        let mut csig1 = if sbet1 != 0.0 || calp1 != 0.0 {
            cbet1 * calp1
        } else {
            1.0
        };
        let comg1 = csig1;
        geomath::norm(&mut ssig1, &mut csig1);

        let k2 = sq(calp0) * geod.ep2;
        let eps = k2 / (2.0 * (1.0 + (1.0 + k2).sqrt()) + k2);

        let mut line = Self {
            lat1,
            lon1,
            azi1,
            caps,
            a: geod.a,
            f: geod.f,
            b: geod.b,
            c2: geod.c2,
            f1: geod.f1,
            tiny: geod.tiny,
            salp1,
            calp1,
            dn1,
            salp0,
            calp0,
            ssig1,
            csig1,
            somg1,
            comg1,
            k2,
            A1m1: f64::NAN,
            A2m1: f64::NAN,
            A3c: f64::NAN,
            A4: f64::NAN,
            B11: f64::NAN,
            B21: f64::NAN,
            B31: f64::NAN,
            B41: f64::NAN,
            stau1: f64::NAN,
            ctau1: f64::NAN,
            c1a: [0.0; CARR_SIZE],
            c1pa: [0.0; CARR_SIZE],
            c2a: [0.0; CARR_SIZE],
            c3a: [0.0; GEODESIC_ORDER],
            c4a: [0.0; GEODESIC_ORDER],
        };

        if caps.contains(Mask::CAP_C1) {
            line.A1m1 = geomath::a1m1f(eps);
            geomath::c1f(eps, &mut line.c1a);
            line.B11 = geomath::sin_cos_series(true, ssig1, csig1, &line.c1a);
            let (s, c) = line.B11.sin_cos();
            line.stau1 = ssig1 * c + csig1 * s;
            line.ctau1 = csig1 * c - ssig1 * s;
        }
        if caps.contains(Mask::CAP_C1P) {
            geomath::c1pf(eps, &mut line.c1pa);
        }
        if caps.contains(Mask::CAP_C2) {
            line.A2m1 = geomath::a2m1f(eps);
            geomath::c2f(eps, &mut line.c2a);
            line.B21 = geomath::sin_cos_series(true, ssig1, csig1, &line.c2a);
        }
        if caps.contains(Mask::CAP_C3) {
            geod.c3f(eps, &mut line.c3a);
            line.A3c = -geod.f * salp0 * geod.a3f(eps);
            line.B31 = geomath::sin_cos_series(true, ssig1, csig1, &line.c3a);
        }
        if caps.contains(Mask::CAP_C4) {
            geod.c4f(eps, &mut line.c4a);
            line.A4 = sq(geod.a) * calp0 * salp0 * geod.e2;
            line.B41 = geomath::sin_cos_series(false, ssig1, csig1, &line.c4a);
        }
        line
    }

    /// The capabilities this line was built with.
    pub fn capabilities(&self) -> Mask {
        self.caps
    }

    pub fn latitude(&self) -> f64 {
        self.lat1
    }

    pub fn longitude(&self) -> f64 {
        self.lon1
    }

    pub fn azimuth(&self) -> f64 {
        self.azi1
    }

    pub fn equatorial_radius(&self) -> f64 {
        self.a
    }

    pub fn flattening(&self) -> f64 {
        self.f
    }

    /// Evaluate the line at distance `s12` (metres).
    ///
    /// Every field is NaN unless the line was built with `DISTANCE_IN`.
    pub fn position_with_capabilities(&self, s12: f64, caps: Mask) -> GeodesicData {
        self.gen_position(false, s12, caps)
    }

    /// Evaluate the line at distance `s12` for the standard outputs.
    pub fn position(&self, s12: f64) -> GeodesicData {
        self.position_with_capabilities(s12, Mask::STANDARD)
    }

    /// Evaluate the line at arc length `a12` (degrees on the auxiliary sphere).
    pub fn arc_position_with_capabilities(&self, a12: f64, caps: Mask) -> GeodesicData {
        self.gen_position(true, a12, caps)
    }

    fn gen_position(&self, arcmode: bool, s12_a12: f64, caps: Mask) -> GeodesicData {
        let requested = caps & Mask::OUT_MASK;
        let outmask = requested & self.caps & Mask::OUT_MASK;

        let lon1 = if requested.contains(Mask::LONG_UNROLL) {
            self.lon1
        } else {
            geomath::ang_normalize(self.lon1)
        };
        let mut data = GeodesicData::undefined(self.lat1, lon1);
        if !(arcmode || self.caps.intersects(Mask::OUT_MASK & Mask::DISTANCE_IN)) {
            return data;
        }
        data.azi1 = self.azi1;

        let mut B12 = 0.0;
        let mut AB1 = 0.0;
        let (sig12, ssig12, csig12) = if arcmode {
            let (s, c) = geomath::sincosd(s12_a12);
            (s12_a12.to_radians(), s, c)
        } else {
            let tau12 = s12_a12 / (self.b * (1.0 + self.A1m1));
            let (s, c) = tau12.sin_cos();
            B12 = -geomath::sin_cos_series(
                true,
                self.stau1 * c + self.ctau1 * s,
                self.ctau1 * c - self.stau1 * s,
                &self.c1pa,
            );
            let mut sig12 = tau12 - (B12 - self.B11);
            if self.f.abs() > 0.01 {
                // One Newton step on the distance for strongly flattened ellipsoids.
                let (ssig12, csig12) = sig12.sin_cos();
                let ssig2 = self.ssig1 * csig12 + self.csig1 * ssig12;
                let csig2 = self.csig1 * csig12 - self.ssig1 * ssig12;
                B12 = geomath::sin_cos_series(true, ssig2, csig2, &self.c1a);
                let serr = (1.0 + self.A1m1) * (sig12 + (B12 - self.B11)) - s12_a12 / self.b;
                sig12 -= serr / (1.0 + self.k2 * sq(ssig2)).sqrt();
            }
            let (s, c) = sig12.sin_cos();
            (sig12, s, c)
        };

        let ssig2 = self.ssig1 * csig12 + self.csig1 * ssig12;
        let mut csig2 = self.csig1 * csig12 - self.ssig1 * ssig12;
        let dn2 = (1.0 + self.k2 * sq(ssig2)).sqrt();
        if outmask.intersects(Mask::DISTANCE | Mask::REDUCED_LENGTH | Mask::GEODESIC_SCALE) {
            if arcmode || self.f.abs() > 0.01 {
                B12 = geomath::sin_cos_series(true, ssig2, csig2, &self.c1a);
            }
            AB1 = (1.0 + self.A1m1) * (B12 - self.B11);
        }

        let sbet2 = self.calp0 * ssig2;
        let mut cbet2 = self.salp0.hypot(self.calp0 * csig2);
        if cbet2 == 0.0 {
            // The line passes through a pole.
            cbet2 = self.tiny;
            csig2 = self.tiny;
        }
        let salp2 = self.salp0;
        let calp2 = self.calp0 * csig2;

        if outmask.intersects(Mask::DISTANCE) {
            data.s12 = if arcmode {
                self.b * ((1.0 + self.A1m1) * sig12 + AB1)
            } else {
                s12_a12
            };
        }

        if outmask.intersects(Mask::LONGITUDE) {
            let e = 1.0_f64.copysign(self.salp0);
            let somg2 = self.salp0 * ssig2;
            let comg2 = csig2;
            let omg12 = if outmask.contains(Mask::LONG_UNROLL) {
                e * (sig12 - (ssig2.atan2(csig2) - self.ssig1.atan2(self.csig1))
                    + ((e * somg2).atan2(comg2) - (e * self.somg1).atan2(self.comg1)))
            } else {
                (somg2 * self.comg1 - comg2 * self.somg1)
                    .atan2(comg2 * self.comg1 + somg2 * self.somg1)
            };
            let lam12 = omg12
                + self.A3c
                    * (sig12 + (geomath::sin_cos_series(true, ssig2, csig2, &self.c3a) - self.B31));
            let lon12 = lam12.to_degrees();
            data.lon2 = if outmask.contains(Mask::LONG_UNROLL) {
                self.lon1 + lon12
            } else {
                geomath::ang_normalize(
                    geomath::ang_normalize(self.lon1) + geomath::ang_normalize(lon12),
                )
            };
        }

        if outmask.intersects(Mask::LATITUDE) {
            data.lat2 = geomath::atan2d(sbet2, self.f1 * cbet2);
        }
        if outmask.intersects(Mask::AZIMUTH) {
            data.azi2 = geomath::atan2d(salp2, calp2);
        }

        if outmask.intersects(Mask::REDUCED_LENGTH | Mask::GEODESIC_SCALE) {
            let B22 = geomath::sin_cos_series(true, ssig2, csig2, &self.c2a);
            let AB2 = (1.0 + self.A2m1) * (B22 - self.B21);
            let J12 = (self.A1m1 - self.A2m1) * sig12 + (AB1 - AB2);
            if outmask.intersects(Mask::REDUCED_LENGTH) {
                data.m12 = self.b
                    * ((dn2 * (self.csig1 * ssig2) - self.dn1 * (self.ssig1 * csig2))
                        - self.csig1 * csig2 * J12);
            }
            if outmask.intersects(Mask::GEODESIC_SCALE) {
                let t = self.k2 * (ssig2 - self.ssig1) * (ssig2 + self.ssig1) / (self.dn1 + dn2);
                data.scale12 = csig12 + (t * ssig2 - csig2 * J12) * self.ssig1 / self.dn1;
                data.scale21 = csig12 - (t * self.ssig1 - self.csig1 * J12) * ssig2 / dn2;
            }
        }

        if outmask.intersects(Mask::AREA) {
            let B42 = geomath::sin_cos_series(false, ssig2, csig2, &self.c4a);
            let (salp12, calp12) = if self.calp0 == 0.0 || self.salp0 == 0.0 {
                (
                    salp2 * self.calp1 - calp2 * self.salp1,
                    calp2 * self.calp1 + salp2 * self.salp1,
                )
            } else {
                (
                    self.calp0
                        * self.salp0
                        * if csig12 <= 0.0 {
                            self.csig1 * (1.0 - csig12) + ssig12 * self.ssig1
                        } else {
                            ssig12 * (self.csig1 * ssig12 / (1.0 + csig12) + self.ssig1)
                        },
                    sq(self.salp0) + sq(self.calp0) * self.csig1 * csig2,
                )
            };
            data.area = self.c2 * salp12.atan2(calp12) + self.A4 * (B42 - self.B41);
        }

        data.a12 = if arcmode {
            s12_a12
        } else {
            sig12.to_degrees()
        };
        data
    }
}

impl GeodesicPath for GeodesicLine {
    fn position_with_capabilities(&self, s12: f64, caps: Mask) -> GeodesicData {
        GeodesicLine::position_with_capabilities(self, s12, caps)
    }
}
