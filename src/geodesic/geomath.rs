//! Degree-based trigonometry and series helpers shared by the geodesic engine.
//!
//! Angles in degrees are reduced exactly before conversion to radians so that
//! multiples of 90° give exact zeros and unit values.

use super::GEODESIC_ORDER;

/// Binary digits in the `f64` mantissa.
pub const DIGITS: u64 = 53;

pub fn sq(x: f64) -> f64 {
    x * x
}

/// Error-free sum: returns `(s, t)` with `s = round(u + v)` and `t = u + v - s`.
pub fn sum(u: f64, v: f64) -> (f64, f64) {
    let s = u + v;
    let up = s - v;
    let vpp = s - up;
    let up = up - u;
    let vpp = vpp - v;
    let t = if s == 0.0 { s } else { 0.0 - (up + vpp) };
    (s, t)
}

/// Evaluate the polynomial of degree `n` with coefficients `p[0..=n]` (highest first).
pub fn polyval(n: usize, p: &[f64], x: f64) -> f64 {
    p[1..=n].iter().fold(p[0], |y, &c| y * x + c)
}

/// IEEE remainder of `x / y`, result in [-y/2, y/2].
fn remainder(x: f64, y: f64) -> f64 {
    let z = x % y;
    if z > y / 2.0 {
        z - y
    } else if z < -y / 2.0 {
        z + y
    } else {
        z
    }
}

/// Round tiny angles so that differences near zero are representable exactly.
pub fn ang_round(x: f64) -> f64 {
    let z = 1.0 / 16.0;
    let mut y = x.abs();
    if y < z {
        y = z - (z - y);
    }
    if x == 0.0 {
        x
    } else {
        y.copysign(x)
    }
}

/// Reduce an angle to [-180, 180].
pub fn ang_normalize(x: f64) -> f64 {
    let y = remainder(x, 360.0);
    if y.abs() == 180.0 {
        180.0_f64.copysign(x)
    } else {
        y
    }
}

/// Replace latitudes outside [-90, 90] with NaN.
pub fn lat_fix(x: f64) -> f64 {
    if x.abs() > 90.0 {
        f64::NAN
    } else {
        x
    }
}

/// Exact difference `y - x` reduced to [-180, 180], with its rounding error.
pub fn ang_diff(x: f64, y: f64) -> (f64, f64) {
    let (d, t) = sum(remainder(-x, 360.0), remainder(y, 360.0));
    let (d, t) = sum(remainder(d, 360.0), t);
    let d = if d == 0.0 || d.abs() == 180.0 {
        d.copysign(if t == 0.0 { y - x } else { -t })
    } else {
        d
    };
    (d, t)
}

/// Sine and cosine of an angle in degrees.
pub fn sincosd(x: f64) -> (f64, f64) {
    let mut r = x % 360.0;
    let q = if r.is_nan() { 0 } else { (r / 90.0).round() as i64 };
    r -= 90.0 * q as f64;
    let r = r.to_radians();
    let (s, c) = r.sin_cos();
    let (sinx, cosx) = match q.rem_euclid(4) {
        0 => (s, c),
        1 => (c, -s),
        2 => (-s, -c),
        _ => (-c, s),
    };
    let cosx = cosx + 0.0;
    let sinx = if sinx == 0.0 { sinx.copysign(x) } else { sinx };
    (sinx, cosx)
}

/// Two-argument arc tangent in degrees, exact at multiples of 45°.
pub fn atan2d(y: f64, x: f64) -> f64 {
    let (mut y, mut x) = (y, x);
    let mut q = 0;
    if y.abs() > x.abs() {
        std::mem::swap(&mut x, &mut y);
        q = 2;
    }
    if x < 0.0 {
        x = -x;
        q += 1;
    }
    let ang = y.atan2(x).to_degrees();
    match q {
        1 => 180.0_f64.copysign(y) - ang,
        2 => 90.0 - ang,
        3 => -90.0 + ang,
        _ => ang,
    }
}

/// `es * atanh(es * x)` for oblate, `-es * atan(es * x)` for prolate ellipsoids.
pub fn eatanhe(x: f64, es: f64) -> f64 {
    if es > 0.0 {
        es * (es * x).atanh()
    } else {
        -es * (es * x).atan()
    }
}

/// Normalise `(s, c)` to a unit vector.
pub fn norm(s: &mut f64, c: &mut f64) {
    let r = s.hypot(*c);
    *s /= r;
    *c /= r;
}

/// Clenshaw summation of a sine series (`sinp`) or cosine series.
///
/// For a sine series `c[0]` is unused.
pub fn sin_cos_series(sinp: bool, sinx: f64, cosx: f64, c: &[f64]) -> f64 {
    let mut k = c.len();
    let mut n = k - usize::from(sinp);
    let ar = 2.0 * (cosx - sinx) * (cosx + sinx);
    let mut y1 = 0.0;
    let mut y0 = if n & 1 == 1 {
        k -= 1;
        c[k]
    } else {
        0.0
    };
    n /= 2;
    while n > 0 {
        n -= 1;
        k -= 1;
        y1 = ar * y0 - y1 + c[k];
        k -= 1;
        y0 = ar * y1 - y0 + c[k];
    }
    if sinp {
        2.0 * sinx * cosx * y0
    } else {
        cosx * (y0 - y1)
    }
}

/// Positive root `k` of the astroid equation used to seed nearly antipodal inverse problems.
pub fn astroid(x: f64, y: f64) -> f64 {
    let p = sq(x);
    let q = sq(y);
    let r = (p + q - 1.0) / 6.0;
    if q == 0.0 && r <= 0.0 {
        return 0.0;
    }
    let s = p * q / 4.0;
    let r2 = sq(r);
    let r3 = r * r2;
    let disc = s * (s + 2.0 * r3);
    let mut u = r;
    if disc >= 0.0 {
        let mut t3 = s + r3;
        t3 += if t3 < 0.0 { -disc.sqrt() } else { disc.sqrt() };
        let t = t3.cbrt();
        u += t + if t != 0.0 { r2 / t } else { 0.0 };
    } else {
        let ang = (-disc).sqrt().atan2(-(s + r3));
        u += 2.0 * r * (ang / 3.0).cos();
    }
    let v = (sq(u) + q).sqrt();
    let uv = if u < 0.0 { q / (v - u) } else { u + v };
    let w = (uv - q) / (2.0 * v);
    uv / ((uv + sq(w)).sqrt() + w)
}

/// Series coefficients are stored as polynomials in eps^2; each block holds
/// `m + 1` numerators followed by one denominator.
fn fill_series(eps: f64, coeff: &[f64], c: &mut [f64; GEODESIC_ORDER + 1]) {
    let eps2 = sq(eps);
    let mut d = eps;
    let mut o = 0;
    for l in 1..=GEODESIC_ORDER {
        let m = (GEODESIC_ORDER - l) / 2;
        c[l] = d * polyval(m, &coeff[o..], eps2) / coeff[o + m + 1];
        o += m + 2;
        d *= eps;
    }
}

/// A1 - 1, the scale factor of the distance integral.
pub fn a1m1f(eps: f64) -> f64 {
    const COEFF: [f64; 5] = [1.0, 4.0, 64.0, 0.0, 256.0];
    let m = GEODESIC_ORDER / 2;
    let t = polyval(m, &COEFF, sq(eps)) / COEFF[m + 1];
    (t + eps) / (1.0 - eps)
}

/// Coefficients C1[l] of the distance integral.
pub fn c1f(eps: f64, c: &mut [f64; GEODESIC_ORDER + 1]) {
    const COEFF: [f64; 18] = [
        -1.0, 6.0, -16.0, 32.0, -9.0, 64.0, -128.0, 2048.0, 9.0, -16.0, 768.0, 3.0, -5.0, 512.0,
        -7.0, 1280.0, -7.0, 2048.0,
    ];
    fill_series(eps, &COEFF, c);
}

/// Coefficients C1'[l] of the inverse distance series.
pub fn c1pf(eps: f64, c: &mut [f64; GEODESIC_ORDER + 1]) {
    const COEFF: [f64; 18] = [
        205.0, -432.0, 768.0, 1536.0, 4005.0, -4736.0, 3840.0, 12288.0, -225.0, 116.0, 384.0,
        -7173.0, 2695.0, 7680.0, 3467.0, 7680.0, 38081.0, 61440.0,
    ];
    fill_series(eps, &COEFF, c);
}

/// A2 - 1, the scale factor of the reduced-length integral.
pub fn a2m1f(eps: f64) -> f64 {
    const COEFF: [f64; 5] = [-11.0, -28.0, -192.0, 0.0, 256.0];
    let m = GEODESIC_ORDER / 2;
    let t = polyval(m, &COEFF, sq(eps)) / COEFF[m + 1];
    (t - eps) / (1.0 + eps)
}

/// Coefficients C2[l] of the reduced-length integral.
pub fn c2f(eps: f64, c: &mut [f64; GEODESIC_ORDER + 1]) {
    const COEFF: [f64; 18] = [
        1.0, 2.0, 16.0, 32.0, 35.0, 64.0, 384.0, 2048.0, 15.0, 80.0, 768.0, 7.0, 35.0, 512.0,
        63.0, 1280.0, 77.0, 2048.0,
    ];
    fill_series(eps, &COEFF, c);
}
