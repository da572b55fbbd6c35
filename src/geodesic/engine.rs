//! Series-expansion geodesic engine for an ellipsoid of revolution.
//!
//! Follows Karney, "Algorithms for geodesics" (J. Geodesy, 2013): the inverse
//! problem is seeded on the auxiliary sphere (or from the astroid for nearly
//! antipodal points) and refined by Newton's method on the azimuth, with
//! bisection as a fallback.

#![allow(non_snake_case)]

use std::f64::consts::PI;

use super::geomath::{self, sq};
use super::line::GeodesicLine;
use super::{GeodesicData, GeodesicEngine, GEODESIC_ORDER};
use crate::capabilities::Mask;
use crate::error::GeodesicError;
use crate::proj::ellipsoid::{Ellipsoid, WGS84};

const COEFF_A3: [f64; 18] = [
    -3.0, 128.0, -2.0, -3.0, 64.0, -1.0, -3.0, -1.0, 16.0, 3.0, -1.0, -2.0, 8.0, 1.0, -1.0, 2.0,
    1.0, 1.0,
];

const COEFF_C3: [f64; 45] = [
    3.0, 128.0, 2.0, 5.0, 128.0, -1.0, 3.0, 3.0, 64.0, -1.0, 0.0, 1.0, 8.0, -1.0, 1.0, 4.0, 5.0,
    256.0, 1.0, 3.0, 128.0, -3.0, -2.0, 3.0, 64.0, 1.0, -3.0, 2.0, 32.0, 7.0, 512.0, -10.0, 9.0,
    384.0, 5.0, -9.0, 5.0, 192.0, 7.0, 512.0, -14.0, 7.0, 512.0, 21.0, 2560.0,
];

const COEFF_C4: [f64; 77] = [
    97.0, 15015.0, 1088.0, 156.0, 45045.0, -224.0, -4784.0, 1573.0, 45045.0, -10656.0, 14144.0,
    -4576.0, -858.0, 45045.0, 64.0, 624.0, -4576.0, 6864.0, -3003.0, 15015.0, 100.0, 208.0, 572.0,
    3432.0, -12012.0, 30030.0, 45045.0, 1.0, 9009.0, -2944.0, 468.0, 135135.0, 5792.0, 1040.0,
    -1287.0, 135135.0, 5952.0, -11648.0, 9152.0, -2574.0, 135135.0, -64.0, -624.0, 4576.0, -6864.0,
    3003.0, 135135.0, 8.0, 10725.0, 1856.0, -936.0, 225225.0, -8448.0, 4992.0, -1144.0, 225225.0,
    -1440.0, 4160.0, -4576.0, 1716.0, 225225.0, -136.0, 63063.0, 1024.0, -208.0, 105105.0, 3584.0,
    -3328.0, 1144.0, 315315.0, -128.0, 135135.0, -2560.0, 832.0, 405405.0, 128.0, 99099.0,
];

const N_C3X: usize = 15;
const N_C4X: usize = 21;

/// Scratch size for the C1 and C2 series (index 0 unused).
pub(crate) const CARR_SIZE: usize = GEODESIC_ORDER + 1;

/// Solver for geodesic problems on one ellipsoid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geodesic {
    ellipsoid: Ellipsoid,
    pub(crate) a: f64,
    pub(crate) f: f64,
    pub(crate) f1: f64,
    pub(crate) e2: f64,
    pub(crate) ep2: f64,
    n: f64,
    pub(crate) b: f64,
    pub(crate) c2: f64,
    etol2: f64,
    a3x: [f64; GEODESIC_ORDER],
    c3x: [f64; N_C3X],
    c4x: [f64; N_C4X],

    maxit1: u64,
    maxit2: u64,
    pub(crate) tiny: f64,
    tol0: f64,
    tol1: f64,
    tolb: f64,
    xthresh: f64,
}

/// Output of the length integrals, scaled to a unit polar semi-axis.
struct Lengths {
    s12b: f64,
    m12b: f64,
    m0: f64,
    scale12: f64,
    scale21: f64,
}

/// Starting guess for the inverse problem.
struct InverseSeed {
    sig12: f64,
    salp1: f64,
    calp1: f64,
    salp2: f64,
    calp2: f64,
    dnm: f64,
}

/// One evaluation of the longitude difference as a function of azimuth.
struct LambdaStep {
    lam12: f64,
    salp2: f64,
    calp2: f64,
    sig12: f64,
    ssig1: f64,
    csig1: f64,
    ssig2: f64,
    csig2: f64,
    eps: f64,
    domg12: f64,
    dlam12: f64,
}

/// Raw inverse solution with azimuths as unnormalised sine/cosine pairs.
struct InverseSolution {
    a12: f64,
    s12: f64,
    salp1: f64,
    calp1: f64,
    salp2: f64,
    calp2: f64,
    m12: f64,
    scale12: f64,
    scale21: f64,
    area: f64,
}

impl Geodesic {
    /// Build an engine for equatorial radius `a` and flattening `f`.
    pub fn new(a: f64, f: f64) -> Result<Self, GeodesicError> {
        Ellipsoid::validated(a, f).map(Self::from_valid)
    }

    /// The WGS84 engine.
    pub fn wgs84() -> Self {
        Self::from_valid(WGS84)
    }

    /// Build an engine for `ellipsoid`, rejecting the same parameters as [`Geodesic::new`].
    pub fn from_ellipsoid(ellipsoid: Ellipsoid) -> Result<Self, GeodesicError> {
        Self::new(ellipsoid.a, ellipsoid.f)
    }

    fn from_valid(ellipsoid: Ellipsoid) -> Self {
        let Ellipsoid { a, f, b, e2, ep2, n } = ellipsoid;
        let maxit1 = 20;
        let maxit2 = maxit1 + geomath::DIGITS + 10;
        let tiny = f64::MIN_POSITIVE.sqrt();
        let tol0 = f64::EPSILON;
        let tol1 = 200.0 * tol0;
        let tol2 = tol0.sqrt();
        let tolb = tol0 * tol2;
        let xthresh = 1000.0 * tol2;

        let f1 = 1.0 - f;
        // Authalic radius squared.
        let c2 = (sq(a)
            + sq(b)
                * if e2 == 0.0 {
                    1.0
                } else {
                    geomath::eatanhe(1.0, f.signum() * e2.abs().sqrt()) / e2
                })
            / 2.0;
        let etol2 = 0.1 * tol2 / (f.abs().max(0.001) * (1.0 - f / 2.0).min(1.0) / 2.0).sqrt();

        let mut a3x = [0.0; GEODESIC_ORDER];
        let mut o = 0;
        for (k, j) in (0..GEODESIC_ORDER).rev().enumerate() {
            let m = j.min(GEODESIC_ORDER - j - 1);
            a3x[k] = geomath::polyval(m, &COEFF_A3[o..], n) / COEFF_A3[o + m + 1];
            o += m + 2;
        }

        let mut c3x = [0.0; N_C3X];
        let (mut o, mut k) = (0, 0);
        for l in 1..GEODESIC_ORDER {
            for j in (l..GEODESIC_ORDER).rev() {
                let m = j.min(GEODESIC_ORDER - j - 1);
                c3x[k] = geomath::polyval(m, &COEFF_C3[o..], n) / COEFF_C3[o + m + 1];
                k += 1;
                o += m + 2;
            }
        }

        let mut c4x = [0.0; N_C4X];
        let (mut o, mut k) = (0, 0);
        for l in 0..GEODESIC_ORDER {
            for j in (l..GEODESIC_ORDER).rev() {
                let m = GEODESIC_ORDER - j - 1;
                c4x[k] = geomath::polyval(m, &COEFF_C4[o..], n) / COEFF_C4[o + m + 1];
                k += 1;
                o += m + 2;
            }
        }

        Self {
            ellipsoid,
            a,
            f,
            f1,
            e2,
            ep2,
            n,
            b,
            c2,
            etol2,
            a3x,
            c3x,
            c4x,
            maxit1,
            maxit2,
            tiny,
            tol0,
            tol1,
            tolb,
            xthresh,
        }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub(crate) fn a3f(&self, eps: f64) -> f64 {
        geomath::polyval(GEODESIC_ORDER - 1, &self.a3x, eps)
    }

    pub(crate) fn c3f(&self, eps: f64, c: &mut [f64; GEODESIC_ORDER]) {
        let mut mult = 1.0;
        let mut o = 0;
        for (l, cl) in c.iter_mut().enumerate().skip(1) {
            let m = GEODESIC_ORDER - l - 1;
            mult *= eps;
            *cl = mult * geomath::polyval(m, &self.c3x[o..], eps);
            o += m + 1;
        }
    }

    pub(crate) fn c4f(&self, eps: f64, c: &mut [f64; GEODESIC_ORDER]) {
        let mut mult = 1.0;
        let mut o = 0;
        for (l, cl) in c.iter_mut().enumerate() {
            let m = GEODESIC_ORDER - l - 1;
            *cl = mult * geomath::polyval(m, &self.c4x[o..], eps);
            o += m + 1;
            mult *= eps;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lengths(
        &self,
        eps: f64,
        sig12: f64,
        ssig1: f64,
        csig1: f64,
        dn1: f64,
        ssig2: f64,
        csig2: f64,
        dn2: f64,
        cbet1: f64,
        cbet2: f64,
        outmask: Mask,
    ) -> Lengths {
        let outmask = outmask & Mask::OUT_MASK;
        let mut out = Lengths {
            s12b: f64::NAN,
            m12b: f64::NAN,
            m0: f64::NAN,
            scale12: f64::NAN,
            scale21: f64::NAN,
        };
        let wants_m = outmask.intersects(Mask::REDUCED_LENGTH | Mask::GEODESIC_SCALE);

        let mut c1a = [0.0; CARR_SIZE];
        let mut c2a = [0.0; CARR_SIZE];
        let mut A1 = 0.0;
        let mut A2 = 0.0;
        let mut m0x = 0.0;
        let mut J12 = 0.0;

        if outmask.intersects(Mask::DISTANCE) || wants_m {
            A1 = geomath::a1m1f(eps);
            geomath::c1f(eps, &mut c1a);
            if wants_m {
                A2 = geomath::a2m1f(eps);
                geomath::c2f(eps, &mut c2a);
                m0x = A1 - A2;
                A2 += 1.0;
            }
            A1 += 1.0;
        }
        if outmask.intersects(Mask::DISTANCE) {
            let B1 = geomath::sin_cos_series(true, ssig2, csig2, &c1a)
                - geomath::sin_cos_series(true, ssig1, csig1, &c1a);
            out.s12b = A1 * (sig12 + B1);
            if wants_m {
                let B2 = geomath::sin_cos_series(true, ssig2, csig2, &c2a)
                    - geomath::sin_cos_series(true, ssig1, csig1, &c2a);
                J12 = m0x * sig12 + (A1 * B1 - A2 * B2);
            }
        } else if wants_m {
            for l in 1..CARR_SIZE {
                c2a[l] = A1 * c1a[l] - A2 * c2a[l];
            }
            J12 = m0x * sig12
                + (geomath::sin_cos_series(true, ssig2, csig2, &c2a)
                    - geomath::sin_cos_series(true, ssig1, csig1, &c2a));
        }
        if outmask.intersects(Mask::REDUCED_LENGTH) {
            out.m0 = m0x;
            out.m12b = dn2 * (csig1 * ssig2) - dn1 * (ssig1 * csig2) - csig1 * csig2 * J12;
        }
        if outmask.intersects(Mask::GEODESIC_SCALE) {
            let csig12 = csig1 * csig2 + ssig1 * ssig2;
            let t = self.ep2 * (cbet1 - cbet2) * (cbet1 + cbet2) / (dn1 + dn2);
            out.scale12 = csig12 + (t * ssig2 - csig2 * J12) * ssig1 / dn1;
            out.scale21 = csig12 - (t * ssig1 - csig1 * J12) * ssig2 / dn2;
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn inverse_start(
        &self,
        sbet1: f64,
        cbet1: f64,
        dn1: f64,
        sbet2: f64,
        cbet2: f64,
        dn2: f64,
        lam12: f64,
        slam12: f64,
        clam12: f64,
    ) -> InverseSeed {
        let mut seed = InverseSeed {
            sig12: -1.0,
            salp1: 0.0,
            calp1: 0.0,
            salp2: f64::NAN,
            calp2: f64::NAN,
            dnm: f64::NAN,
        };

        let sbet12 = sbet2 * cbet1 - cbet2 * sbet1;
        let cbet12 = cbet2 * cbet1 + sbet2 * sbet1;
        let sbet12a = sbet2 * cbet1 + cbet2 * sbet1;

        let shortline = cbet12 >= 0.0 && sbet12 < 0.5 && cbet2 * lam12 < 0.5;
        let (mut somg12, mut comg12) = if shortline {
            let mut sbetm2 = sq(sbet1 + sbet2);
            sbetm2 /= sbetm2 + sq(cbet1 + cbet2);
            seed.dnm = (1.0 + self.ep2 * sbetm2).sqrt();
            let omg12 = lam12 / (self.f1 * seed.dnm);
            omg12.sin_cos()
        } else {
            (slam12, clam12)
        };

        let mut salp1 = cbet2 * somg12;
        let mut calp1 = if comg12 >= 0.0 {
            sbet12 + cbet2 * sbet1 * sq(somg12) / (1.0 + comg12)
        } else {
            sbet12a - cbet2 * sbet1 * sq(somg12) / (1.0 - comg12)
        };

        let ssig12 = salp1.hypot(calp1);
        let csig12 = sbet1 * sbet2 + cbet1 * cbet2 * comg12;

        if shortline && ssig12 < self.etol2 {
            let mut salp2 = cbet1 * somg12;
            let mut calp2 = sbet12
                - cbet1
                    * sbet2
                    * if comg12 >= 0.0 {
                        sq(somg12) / (1.0 + comg12)
                    } else {
                        1.0 - comg12
                    };
            geomath::norm(&mut salp2, &mut calp2);
            seed.salp2 = salp2;
            seed.calp2 = calp2;
            seed.sig12 = ssig12.atan2(csig12);
        } else if self.n.abs() > 0.1
            || csig12 >= 0.0
            || ssig12 >= 6.0 * self.n.abs() * PI * sq(cbet1)
        {
            // The zeroth-order spherical approximation is good enough.
        } else {
            // Nearly antipodal: scale onto the astroid problem.
            let lam12x = (-slam12).atan2(-clam12);
            let (x, y, lamscale) = if self.f >= 0.0 {
                let k2 = sq(sbet1) * self.ep2;
                let eps = k2 / (2.0 * (1.0 + (1.0 + k2).sqrt()) + k2);
                let lamscale = self.f * cbet1 * self.a3f(eps) * PI;
                let betscale = lamscale * cbet1;
                (lam12x / lamscale, sbet12a / betscale, lamscale)
            } else {
                let cbet12a = cbet2 * cbet1 - sbet2 * sbet1;
                let bet12a = sbet12a.atan2(cbet12a);
                let l = self.lengths(
                    self.n,
                    PI + bet12a,
                    sbet1,
                    -cbet1,
                    dn1,
                    sbet2,
                    cbet2,
                    dn2,
                    cbet1,
                    cbet2,
                    Mask::REDUCED_LENGTH,
                );
                let x = -1.0 + l.m12b / (cbet1 * cbet2 * l.m0 * PI);
                let betscale = if x < -0.01 {
                    sbet12a / x
                } else {
                    -self.f * sq(cbet1) * PI
                };
                let lamscale = betscale / cbet1;
                (x, lam12x / lamscale, lamscale)
            };

            if y > -self.tol1 && x > -1.0 - self.xthresh {
                if self.f >= 0.0 {
                    salp1 = (-x).min(1.0);
                    calp1 = -(1.0 - sq(salp1)).sqrt();
                } else {
                    calp1 = x.max(if x > -self.tol1 { 0.0 } else { -1.0 });
                    salp1 = (1.0 - sq(calp1)).sqrt();
                }
            } else {
                let k = geomath::astroid(x, y);
                let omg12a = lamscale
                    * if self.f >= 0.0 {
                        -x * k / (1.0 + k)
                    } else {
                        -y * (1.0 + k) / k
                    };
                somg12 = omg12a.sin();
                comg12 = -omg12a.cos();
                salp1 = cbet2 * somg12;
                calp1 = sbet12a - cbet2 * sbet1 * sq(somg12) / (1.0 - comg12);
            }
        }

        if salp1 > 0.0 || salp1.is_nan() {
            geomath::norm(&mut salp1, &mut calp1);
        } else {
            salp1 = 1.0;
            calp1 = 0.0;
        }
        seed.salp1 = salp1;
        seed.calp1 = calp1;
        seed
    }

    #[allow(clippy::too_many_arguments)]
    fn lambda12(
        &self,
        sbet1: f64,
        cbet1: f64,
        dn1: f64,
        sbet2: f64,
        cbet2: f64,
        dn2: f64,
        salp1: f64,
        calp1: f64,
        slam120: f64,
        clam120: f64,
        diffp: bool,
    ) -> LambdaStep {
        let calp1 = if sbet1 == 0.0 && calp1 == 0.0 {
            // Break the degeneracy of equatorial lines.
            -self.tiny
        } else {
            calp1
        };
        let salp0 = salp1 * cbet1;
        let calp0 = calp1.hypot(salp1 * sbet1);

        let mut ssig1 = sbet1;
        let somg1 = salp0 * sbet1;
        let mut csig1 = calp1 * cbet1;
        let comg1 = calp1 * cbet1;
        geomath::norm(&mut ssig1, &mut csig1);

        let salp2 = if cbet2 != cbet1 { salp0 / cbet2 } else { salp1 };
        let calp2 = if cbet2 != cbet1 || sbet2.abs() != -sbet1 {
            (sq(calp1 * cbet1)
                + if cbet1 < -sbet1 {
                    (cbet2 - cbet1) * (cbet1 + cbet2)
                } else {
                    (sbet1 - sbet2) * (sbet1 + sbet2)
                })
            .sqrt()
                / cbet2
        } else {
            calp1.abs()
        };

        let mut ssig2 = sbet2;
        let somg2 = salp0 * sbet2;
        let mut csig2 = calp2 * cbet2;
        let comg2 = calp2 * cbet2;
        geomath::norm(&mut ssig2, &mut csig2);

        let sig12 = (csig1 * ssig2 - ssig1 * csig2)
            .max(0.0)
            .atan2(csig1 * csig2 + ssig1 * ssig2);
        let somg12 = (comg1 * somg2 - somg1 * comg2).max(0.0);
        let comg12 = comg1 * comg2 + somg1 * somg2;
        let eta = (somg12 * clam120 - comg12 * slam120)
            .atan2(comg12 * clam120 + somg12 * slam120);

        let k2 = sq(calp0) * self.ep2;
        let eps = k2 / (2.0 * (1.0 + (1.0 + k2).sqrt()) + k2);
        let mut c3a = [0.0; GEODESIC_ORDER];
        self.c3f(eps, &mut c3a);
        let B312 = geomath::sin_cos_series(true, ssig2, csig2, &c3a)
            - geomath::sin_cos_series(true, ssig1, csig1, &c3a);
        let domg12 = -self.f * self.a3f(eps) * salp0 * (sig12 + B312);
        let lam12 = eta + domg12;

        let dlam12 = if !diffp {
            f64::NAN
        } else if calp2 == 0.0 {
            -2.0 * self.f1 * dn1 / sbet1
        } else {
            let l = self.lengths(
                eps,
                sig12,
                ssig1,
                csig1,
                dn1,
                ssig2,
                csig2,
                dn2,
                cbet1,
                cbet2,
                Mask::REDUCED_LENGTH,
            );
            l.m12b * self.f1 / (calp2 * cbet2)
        };

        LambdaStep {
            lam12,
            salp2,
            calp2,
            sig12,
            ssig1,
            csig1,
            ssig2,
            csig2,
            eps,
            domg12,
            dlam12,
        }
    }

    fn gen_inverse(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        outmask: Mask,
    ) -> InverseSolution {
        let outmask = outmask & Mask::OUT_MASK;
        let mut sol = InverseSolution {
            a12: f64::NAN,
            s12: f64::NAN,
            salp1: f64::NAN,
            calp1: f64::NAN,
            salp2: f64::NAN,
            calp2: f64::NAN,
            m12: f64::NAN,
            scale12: f64::NAN,
            scale21: f64::NAN,
            area: f64::NAN,
        };

        // Reduce to 0 <= lon12 <= 180 with point 1 the farther from the equator
        // and in the southern hemisphere.
        let (lon12, lon12s) = geomath::ang_diff(lon1, lon2);
        let mut lonsign = if lon12 >= 0.0 { 1.0 } else { -1.0 };
        let lon12 = lonsign * geomath::ang_round(lon12);
        let lon12s = geomath::ang_round((180.0 - lon12) - lonsign * lon12s);
        let lam12 = lon12.to_radians();
        let (slam12, clam12) = if lon12 > 90.0 {
            let (s, c) = geomath::sincosd(lon12s);
            (s, -c)
        } else {
            geomath::sincosd(lon12)
        };

        let mut lat1 = geomath::ang_round(geomath::lat_fix(lat1));
        let mut lat2 = geomath::ang_round(geomath::lat_fix(lat2));
        let swapp = if lat1.abs() < lat2.abs() { -1.0 } else { 1.0 };
        if swapp < 0.0 {
            lonsign *= -1.0;
            std::mem::swap(&mut lat1, &mut lat2);
        }
        let latsign = if lat1 < 0.0 { 1.0 } else { -1.0 };
        lat1 *= latsign;
        lat2 *= latsign;

        let (mut sbet1, mut cbet1) = geomath::sincosd(lat1);
        sbet1 *= self.f1;
        geomath::norm(&mut sbet1, &mut cbet1);
        cbet1 = cbet1.max(self.tiny);

        let (mut sbet2, mut cbet2) = geomath::sincosd(lat2);
        sbet2 *= self.f1;
        geomath::norm(&mut sbet2, &mut cbet2);
        cbet2 = cbet2.max(self.tiny);

        // Make |bet1| == |bet2| exact when the latitudes are equal in magnitude.
        if cbet1 < -sbet1 {
            if cbet2 == cbet1 {
                sbet2 = if sbet2 < 0.0 { sbet1 } else { -sbet1 };
            }
        } else if sbet2.abs() == -sbet1 {
            cbet2 = cbet1;
        }

        let dn1 = (1.0 + self.ep2 * sq(sbet1)).sqrt();
        let dn2 = (1.0 + self.ep2 * sq(sbet2)).sqrt();

        let mut meridian = lat1 == -90.0 || slam12 == 0.0;
        let (mut salp1, mut calp1, mut salp2, mut calp2) = (0.0, 0.0, 0.0, 0.0);
        let mut sig12 = 0.0;
        let mut s12x = 0.0;
        let mut m12x = 0.0;
        let mut a12 = f64::NAN;

        if meridian {
            // Point 2 lies on the meridian through point 1, or point 1 is a pole.
            calp1 = clam12;
            salp1 = slam12;
            calp2 = 1.0;
            salp2 = 0.0;

            let ssig1 = sbet1;
            let csig1 = calp1 * cbet1;
            let ssig2 = sbet2;
            let csig2 = calp2 * cbet2;

            sig12 = (csig1 * ssig2 - ssig1 * csig2)
                .max(0.0)
                .atan2(csig1 * csig2 + ssig1 * ssig2);
            let l = self.lengths(
                self.n,
                sig12,
                ssig1,
                csig1,
                dn1,
                ssig2,
                csig2,
                dn2,
                cbet1,
                cbet2,
                outmask | Mask::DISTANCE | Mask::REDUCED_LENGTH,
            );
            s12x = l.s12b;
            m12x = l.m12b;
            sol.scale12 = l.scale12;
            sol.scale21 = l.scale21;

            // A meridian is the shortest path unless m12 goes negative first.
            if sig12 < 1.0 || m12x >= 0.0 {
                if sig12 < 3.0 * self.tiny || (sig12 < self.tol0 && (s12x < 0.0 || m12x < 0.0)) {
                    sig12 = 0.0;
                    m12x = 0.0;
                    s12x = 0.0;
                }
                m12x *= self.b;
                s12x *= self.b;
                a12 = sig12.to_degrees();
            } else {
                meridian = false;
            }
        }

        let mut somg12 = 2.0;
        let mut comg12 = 0.0;
        let mut omg12 = 0.0;

        if !meridian && sbet1 == 0.0 && (self.f <= 0.0 || lon12s >= self.f * 180.0) {
            // Equatorial geodesic.
            calp1 = 0.0;
            calp2 = 0.0;
            salp1 = 1.0;
            salp2 = 1.0;
            s12x = self.a * lam12;
            sig12 = lam12 / self.f1;
            omg12 = sig12;
            m12x = self.b * sig12.sin();
            if outmask.intersects(Mask::GEODESIC_SCALE) {
                sol.scale12 = sig12.cos();
                sol.scale21 = sol.scale12;
            }
            a12 = lon12 / self.f1;
        } else if !meridian {
            let seed = self.inverse_start(
                sbet1, cbet1, dn1, sbet2, cbet2, dn2, lam12, slam12, clam12,
            );
            sig12 = seed.sig12;
            salp1 = seed.salp1;
            calp1 = seed.calp1;

            if sig12 >= 0.0 {
                // Short line: the seed is already accurate.
                salp2 = seed.salp2;
                calp2 = seed.calp2;
                let dnm = seed.dnm;
                s12x = sig12 * self.b * dnm;
                m12x = sq(dnm) * self.b * (sig12 / dnm).sin();
                if outmask.intersects(Mask::GEODESIC_SCALE) {
                    sol.scale12 = (sig12 / dnm).cos();
                    sol.scale21 = sol.scale12;
                }
                a12 = sig12.to_degrees();
                omg12 = lam12 / (self.f1 * dnm);
            } else {
                // Newton's method on alpha1, bracketed by [alp1a, alp1b].
                let mut tripn = false;
                let mut tripb = false;
                let mut salp1a = self.tiny;
                let mut calp1a = 1.0;
                let mut salp1b = self.tiny;
                let mut calp1b = -1.0;
                let mut numit = 0;
                let mut step = self.lambda12(
                    sbet1, cbet1, dn1, sbet2, cbet2, dn2, salp1, calp1, slam12, clam12, true,
                );
                loop {
                    let v = step.lam12;
                    if tripb
                        || !(v.abs() >= if tripn { 8.0 } else { 1.0 } * self.tol0)
                        || numit == self.maxit2
                    {
                        break;
                    }
                    if v > 0.0 && (numit > self.maxit1 || calp1 / salp1 > calp1b / salp1b) {
                        salp1b = salp1;
                        calp1b = calp1;
                    } else if v < 0.0 && (numit > self.maxit1 || calp1 / salp1 < calp1a / salp1a) {
                        salp1a = salp1;
                        calp1a = calp1;
                    }

                    let mut newton = false;
                    if numit < self.maxit1 && step.dlam12 > 0.0 {
                        let dalp1 = -v / step.dlam12;
                        if dalp1.abs() < PI {
                            let (sdalp1, cdalp1) = dalp1.sin_cos();
                            let nsalp1 = salp1 * cdalp1 + calp1 * sdalp1;
                            if nsalp1 > 0.0 {
                                calp1 = calp1 * cdalp1 - salp1 * sdalp1;
                                salp1 = nsalp1;
                                geomath::norm(&mut salp1, &mut calp1);
                                tripn = v.abs() <= 16.0 * self.tol0;
                                newton = true;
                            }
                        }
                    }
                    if !newton {
                        // Bisect when Newton's step leaves the bracket.
                        salp1 = (salp1a + salp1b) / 2.0;
                        calp1 = (calp1a + calp1b) / 2.0;
                        geomath::norm(&mut salp1, &mut calp1);
                        tripn = false;
                        tripb = (salp1a - salp1).abs() + (calp1a - calp1) < self.tolb
                            || (salp1 - salp1b).abs() + (calp1 - calp1b) < self.tolb;
                    }

                    numit += 1;
                    step = self.lambda12(
                        sbet1,
                        cbet1,
                        dn1,
                        sbet2,
                        cbet2,
                        dn2,
                        salp1,
                        calp1,
                        slam12,
                        clam12,
                        numit < self.maxit1,
                    );
                }

                salp2 = step.salp2;
                calp2 = step.calp2;
                sig12 = step.sig12;

                // Reduced length and scale always go through the distance integral.
                let needs_distance =
                    outmask.intersects(Mask::REDUCED_LENGTH | Mask::GEODESIC_SCALE);
                let lengthmask = if needs_distance {
                    outmask | Mask::DISTANCE
                } else {
                    outmask
                };
                let l = self.lengths(
                    step.eps,
                    sig12,
                    step.ssig1,
                    step.csig1,
                    dn1,
                    step.ssig2,
                    step.csig2,
                    dn2,
                    cbet1,
                    cbet2,
                    lengthmask,
                );
                s12x = l.s12b * self.b;
                m12x = l.m12b * self.b;
                sol.scale12 = l.scale12;
                sol.scale21 = l.scale21;
                a12 = sig12.to_degrees();

                if outmask.intersects(Mask::AREA) {
                    let (sdomg12, cdomg12) = step.domg12.sin_cos();
                    somg12 = slam12 * cdomg12 - clam12 * sdomg12;
                    comg12 = clam12 * cdomg12 + slam12 * sdomg12;
                }
            }
        }

        if outmask.intersects(Mask::DISTANCE) {
            sol.s12 = 0.0 + s12x;
        }
        if outmask.intersects(Mask::REDUCED_LENGTH) {
            sol.m12 = 0.0 + m12x;
        }

        if outmask.intersects(Mask::AREA) {
            let salp0 = salp1 * cbet1;
            let calp0 = calp1.hypot(salp1 * sbet1);
            let mut area = if calp0 != 0.0 && salp0 != 0.0 {
                let mut ssig1 = sbet1;
                let mut csig1 = calp1 * cbet1;
                let mut ssig2 = sbet2;
                let mut csig2 = calp2 * cbet2;
                let k2 = sq(calp0) * self.ep2;
                let eps = k2 / (2.0 * (1.0 + (1.0 + k2).sqrt()) + k2);
                let A4 = sq(self.a) * calp0 * salp0 * self.e2;
                geomath::norm(&mut ssig1, &mut csig1);
                geomath::norm(&mut ssig2, &mut csig2);
                let mut c4a = [0.0; GEODESIC_ORDER];
                self.c4f(eps, &mut c4a);
                let B41 = geomath::sin_cos_series(false, ssig1, csig1, &c4a);
                let B42 = geomath::sin_cos_series(false, ssig2, csig2, &c4a);
                A4 * (B42 - B41)
            } else {
                // Equator or meridian.
                0.0
            };

            if !meridian && somg12 > 1.0 {
                somg12 = omg12.sin();
                comg12 = omg12.cos();
            }

            let alp12 = if !meridian && comg12 > -0.7071 && sbet2 - sbet1 < 1.75 {
                let domg12 = 1.0 + comg12;
                let dbet1 = 1.0 + cbet1;
                let dbet2 = 1.0 + cbet2;
                2.0 * (somg12 * (sbet1 * dbet2 + sbet2 * dbet1))
                    .atan2(domg12 * (sbet1 * sbet2 + dbet1 * dbet2))
            } else {
                let mut salp12 = salp2 * calp1 - calp2 * salp1;
                let mut calp12 = calp2 * calp1 + salp2 * salp1;
                if salp12 == 0.0 && calp12 < 0.0 {
                    salp12 = self.tiny * calp1;
                    calp12 = -1.0;
                }
                salp12.atan2(calp12)
            };
            area += self.c2 * alp12;
            sol.area = area * swapp * lonsign * latsign + 0.0;
        }

        // Undo the reduction to canonical form.
        if swapp < 0.0 {
            std::mem::swap(&mut salp1, &mut salp2);
            std::mem::swap(&mut calp1, &mut calp2);
            if outmask.intersects(Mask::GEODESIC_SCALE) {
                std::mem::swap(&mut sol.scale12, &mut sol.scale21);
            }
        }
        sol.salp1 = salp1 * swapp * lonsign;
        sol.calp1 = calp1 * swapp * latsign;
        sol.salp2 = salp2 * swapp * lonsign;
        sol.calp2 = calp2 * swapp * latsign;
        sol.a12 = a12;
        sol
    }

    /// Solve the inverse problem, filling only the fields named by `caps`.
    pub fn inverse_with_capabilities(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        caps: Mask,
    ) -> GeodesicData {
        let outmask = caps & Mask::OUT_MASK;
        let sol = self.gen_inverse(lat1, lon1, lat2, lon2, outmask);

        let mut data = GeodesicData::undefined(lat1, lon1);
        data.lat1 = geomath::lat_fix(lat1);
        data.lat2 = geomath::lat_fix(lat2);
        data.lon1 = if outmask.contains(Mask::LONG_UNROLL) {
            lon1
        } else {
            geomath::ang_normalize(lon1)
        };
        data.lon2 = if outmask.contains(Mask::LONG_UNROLL) {
            lon1 + geomath::ang_diff(lon1, lon2).0
        } else {
            geomath::ang_normalize(lon2)
        };
        data.a12 = sol.a12;
        if outmask.intersects(Mask::DISTANCE) {
            data.s12 = sol.s12;
        }
        if outmask.intersects(Mask::AZIMUTH) {
            data.azi1 = geomath::atan2d(sol.salp1, sol.calp1);
            data.azi2 = geomath::atan2d(sol.salp2, sol.calp2);
        }
        if outmask.intersects(Mask::REDUCED_LENGTH) {
            data.m12 = sol.m12;
        }
        if outmask.intersects(Mask::GEODESIC_SCALE) {
            data.scale12 = sol.scale12;
            data.scale21 = sol.scale21;
        }
        if outmask.intersects(Mask::AREA) {
            data.area = sol.area;
        }
        data
    }

    /// Solve the inverse problem for the standard outputs.
    pub fn inverse(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> GeodesicData {
        self.inverse_with_capabilities(lat1, lon1, lat2, lon2, Mask::STANDARD)
    }

    /// Build a line from a start point and azimuth.
    pub fn line_with_capabilities(
        &self,
        lat1: f64,
        lon1: f64,
        azi1: f64,
        caps: Mask,
    ) -> GeodesicLine {
        GeodesicLine::new(self, lat1, lon1, azi1, caps)
    }

    /// Build a line able to answer standard position queries by distance.
    pub fn line(&self, lat1: f64, lon1: f64, azi1: f64) -> GeodesicLine {
        self.line_with_capabilities(lat1, lon1, azi1, Mask::STANDARD | Mask::DISTANCE_IN)
    }

    /// Solve the direct problem, filling only the fields named by `caps`.
    pub fn direct_with_capabilities(
        &self,
        lat1: f64,
        lon1: f64,
        azi1: f64,
        s12: f64,
        caps: Mask,
    ) -> GeodesicData {
        // A direct query always takes the distance as input.
        let caps = caps | Mask::DISTANCE_IN;
        GeodesicLine::new(self, lat1, lon1, azi1, caps).position_with_capabilities(s12, caps)
    }

    /// Solve the direct problem for the standard outputs.
    pub fn direct(&self, lat1: f64, lon1: f64, azi1: f64, s12: f64) -> GeodesicData {
        self.direct_with_capabilities(lat1, lon1, azi1, s12, Mask::STANDARD)
    }
}

impl Default for Geodesic {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl GeodesicEngine for Geodesic {
    type Line = GeodesicLine;

    fn equatorial_radius(&self) -> f64 {
        self.a
    }

    fn flattening(&self) -> f64 {
        self.f
    }

    fn inverse_with_capabilities(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        caps: Mask,
    ) -> GeodesicData {
        Geodesic::inverse_with_capabilities(self, lat1, lon1, lat2, lon2, caps)
    }

    fn line_with_capabilities(&self, lat1: f64, lon1: f64, azi1: f64, caps: Mask) -> GeodesicLine {
        Geodesic::line_with_capabilities(self, lat1, lon1, azi1, caps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    /// Quarter meridian of WGS84 (metres).
    const QUARTER_MERIDIAN: f64 = 10_001_965.729_312_8;

    #[test]
    fn test_rejects_invalid_ellipsoid() {
        assert!(Geodesic::new(6_378_137.0, 1.0).is_err());
        assert!(Geodesic::new(-6_378_137.0, 0.0).is_err());
        let g = Geodesic::new(6_378_137.0, 1.0 / 298.257_223_563).unwrap();
        assert_eq!(g, Geodesic::wgs84());
    }

    #[test]
    fn test_from_ellipsoid_validates() {
        assert!(Geodesic::from_ellipsoid(Ellipsoid::new(6_378_137.0, 1.0)).is_err());
        assert!(Geodesic::from_ellipsoid(Ellipsoid::new(6_378_137.0, f64::NAN)).is_err());
        assert_eq!(Geodesic::from_ellipsoid(WGS84).unwrap(), Geodesic::wgs84());
    }

    #[test]
    fn test_equatorial_inverse_closed_form() {
        let g = Geodesic::wgs84();
        let r = g.inverse_with_capabilities(0.0, 0.0, 0.0, 1.0, Mask::ALL);
        let lam = 1.0_f64.to_radians();
        let sig = lam / (1.0 - WGS84.f);
        assert_relative_eq!(r.s12, WGS84.a * lam, epsilon = 1e-6);
        assert_relative_eq!(r.m12, WGS84.b * sig.sin(), epsilon = 1e-6);
        assert_relative_eq!(r.scale12, sig.cos(), epsilon = 1e-15);
        assert_relative_eq!(r.scale21, sig.cos(), epsilon = 1e-15);
        assert_eq!(r.azi1, 90.0);
        assert_eq!(r.azi2, 90.0);
        assert_abs_diff_eq!(r.area, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_meridian_distances() {
        let g = Geodesic::wgs84();
        let r = g.inverse(0.0, 0.0, 90.0, 0.0);
        assert_abs_diff_eq!(r.s12, QUARTER_MERIDIAN, epsilon = 1e-3);
        assert_abs_diff_eq!(r.azi1, 0.0, epsilon = 1e-12);

        // Antipodal equatorial points are joined through the poles.
        let r = g.inverse(0.0, 0.0, 0.0, 180.0);
        assert_abs_diff_eq!(r.s12, 2.0 * QUARTER_MERIDIAN, epsilon = 2e-3);
    }

    #[test]
    fn test_known_distances() {
        let g = Geodesic::wgs84();
        // JFK to LHR
        let r = g.inverse(40.6, -73.8, 51.6, -0.5);
        assert_abs_diff_eq!(r.s12, 5_551_760.0, epsilon = 5.0);
        // Wellington to Salamanca, nearly antipodal
        let r = g.inverse(-41.32, 174.81, 40.96, -5.50);
        assert_abs_diff_eq!(r.s12, 19_959_679.267, epsilon = 0.05);
    }

    #[test]
    fn test_inverse_is_symmetric() {
        let g = Geodesic::wgs84();
        let pairs = [
            (10.0, 20.0, -35.0, 140.0),
            (-60.0, -10.0, 45.0, 100.0),
            (0.5, 0.0, -0.5, 179.5),
        ];
        for (lat1, lon1, lat2, lon2) in pairs {
            let fwd = g.inverse_with_capabilities(lat1, lon1, lat2, lon2, Mask::ALL);
            let bwd = g.inverse_with_capabilities(lat2, lon2, lat1, lon1, Mask::ALL);
            assert_relative_eq!(fwd.s12, bwd.s12, max_relative = 1e-13);
            assert_relative_eq!(fwd.m12, bwd.m12, max_relative = 1e-9);
            assert_abs_diff_eq!(fwd.scale12, bwd.scale21, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_direct_inverts_inverse() {
        let g = Geodesic::wgs84();
        let cases = [
            (10.0, 20.0, -35.0, 140.0),
            (51.5, -0.1, 40.7, -74.0),
            (-33.9, 151.2, 35.7, 139.7),
            (0.0, 0.0, 1.0, 1.0),
        ];
        for (lat1, lon1, lat2, lon2) in cases {
            let inv = g.inverse_with_capabilities(lat1, lon1, lat2, lon2, Mask::ALL);
            let dir = g.direct_with_capabilities(
                lat1,
                lon1,
                inv.azi1,
                inv.s12,
                Mask::ALL,
            );
            assert_abs_diff_eq!(dir.lat2, lat2, epsilon = 1e-9);
            assert_abs_diff_eq!(dir.lon2, lon2, epsilon = 1e-9);
            assert_abs_diff_eq!(dir.azi2, inv.azi2, epsilon = 1e-9);
            assert_relative_eq!(dir.m12, inv.m12, max_relative = 1e-9);
            assert_abs_diff_eq!(dir.scale12, inv.scale12, epsilon = 1e-12);
            assert_abs_diff_eq!(dir.a12, inv.a12, epsilon = 1e-11);
        }
    }

    #[test]
    fn test_unrequested_fields_are_nan() {
        let g = Geodesic::wgs84();
        let r = g.inverse_with_capabilities(10.0, 20.0, 30.0, 40.0, Mask::DISTANCE);
        assert!(r.s12.is_finite());
        assert!(r.azi1.is_nan());
        assert!(r.m12.is_nan());
        assert!(r.scale12.is_nan());
        assert!(r.area.is_nan());
    }

    #[test]
    fn test_capability_superset_gives_same_fields() {
        let g = Geodesic::wgs84();
        let narrow = Mask::AZIMUTH | Mask::GEODESIC_SCALE | Mask::REDUCED_LENGTH;
        let cases = [(0.0, 0.0, 10.0, 10.0), (-20.0, 30.0, 50.0, -60.0), (5.0, 5.0, -4.0, -175.0)];
        for (lat1, lon1, lat2, lon2) in cases {
            let a = g.inverse_with_capabilities(lat1, lon1, lat2, lon2, narrow);
            let b = g.inverse_with_capabilities(lat1, lon1, lat2, lon2, Mask::ALL);
            assert_eq!(a.azi1, b.azi1);
            assert_eq!(a.azi2, b.azi2);
            assert_eq!(a.m12, b.m12);
            assert_eq!(a.scale12, b.scale12);
            assert_eq!(a.scale21, b.scale21);
        }
    }

    #[test]
    fn test_short_line_scale_near_one() {
        let g = Geodesic::wgs84();
        let r = g.inverse_with_capabilities(
            45.0,
            7.0,
            45.001,
            7.001,
            Mask::DISTANCE | Mask::REDUCED_LENGTH | Mask::GEODESIC_SCALE,
        );
        assert_relative_eq!(r.m12, r.s12, max_relative = 1e-9);
        assert_abs_diff_eq!(r.scale12, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_sphere_reduced_length() {
        let radius = 6_371_000.0;
        let g = Geodesic::new(radius, 0.0).unwrap();
        let r = g.inverse_with_capabilities(
            10.0,
            20.0,
            -30.0,
            75.0,
            Mask::DISTANCE | Mask::REDUCED_LENGTH | Mask::GEODESIC_SCALE,
        );
        let sigma = r.s12 / radius;
        assert_relative_eq!(r.m12, radius * sigma.sin(), max_relative = 1e-12);
        assert_relative_eq!(r.scale12, sigma.cos(), epsilon = 1e-12);
    }
}
