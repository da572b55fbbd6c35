//! PyO3 bindings for batch gnomonic projection.

use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::geodesic::Geodesic;
use crate::proj::ellipsoid::WGS84;
use crate::proj::gnomonic::{Gnomonic, GnomonicData};

type Columns<'py> = (
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
);

fn build_projection(a: Option<f64>, f: Option<f64>) -> PyResult<Gnomonic> {
    let geodesic = Geodesic::new(a.unwrap_or(WGS84.a), f.unwrap_or(WGS84.f))
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(Gnomonic::new(geodesic))
}

fn pairs(
    name_u: &str,
    u: &PyReadonlyArray1<'_, f64>,
    name_v: &str,
    v: &PyReadonlyArray1<'_, f64>,
) -> PyResult<Vec<(f64, f64)>> {
    let u = u.as_array();
    let v = v.as_array();
    if u.len() != v.len() {
        return Err(PyValueError::new_err(format!(
            "{name_u} and {name_v} must have same length, got {} and {}",
            u.len(),
            v.len()
        )));
    }
    Ok(u.iter().zip(v.iter()).map(|(&ui, &vi)| (ui, vi)).collect())
}

fn to_columns<'py>(
    py: Python<'py>,
    results: &[GnomonicData],
    pick: impl Fn(&GnomonicData) -> [Option<f64>; 4],
) -> Columns<'py> {
    let mut cols: [Vec<f64>; 4] = Default::default();
    for r in results {
        for (col, value) in cols.iter_mut().zip(pick(r)) {
            col.push(value.unwrap_or(f64::NAN));
        }
    }
    let [c0, c1, c2, c3] = cols;
    (
        PyArray1::from_owned_array(py, ndarray::Array1::from(c0)),
        PyArray1::from_owned_array(py, ndarray::Array1::from(c1)),
        PyArray1::from_owned_array(py, ndarray::Array1::from(c2)),
        PyArray1::from_owned_array(py, ndarray::Array1::from(c3)),
    )
}

/// Project geographic points onto the plane tangent at (lat0, lon0).
///
/// Args:
///     lat0: Latitude of the centre in degrees.
///     lon0: Longitude of the centre in degrees.
///     lat: 1D array of latitudes in degrees.
///     lon: 1D array of longitudes in degrees.
///     a: Equatorial radius in metres (default WGS84).
///     f: Flattening (default WGS84).
///
/// Returns:
///     Tuple of (x, y, azi, rk) arrays. x and y are NaN for points outside
///     the projection's domain.
#[pyfunction]
#[pyo3(signature = (lat0, lon0, lat, lon, a=None, f=None))]
pub fn gnomonic_forward<'py>(
    py: Python<'py>,
    lat0: f64,
    lon0: f64,
    lat: PyReadonlyArray1<'py, f64>,
    lon: PyReadonlyArray1<'py, f64>,
    a: Option<f64>,
    f: Option<f64>,
) -> PyResult<Columns<'py>> {
    let points = pairs("lat", &lat, "lon", &lon)?;
    let projection = build_projection(a, f)?;

    let results: Vec<GnomonicData> = py.detach(move || {
        points
            .par_iter()
            .map(|&(lat, lon)| projection.forward(lat0, lon0, lat, lon))
            .collect()
    });

    Ok(to_columns(py, &results, |r| [r.x, r.y, r.azi, r.rk]))
}

/// Recover geographic points from tangent-plane coordinates about (lat0, lon0).
///
/// Args:
///     lat0: Latitude of the centre in degrees.
///     lon0: Longitude of the centre in degrees.
///     x: 1D array of eastings in metres.
///     y: 1D array of northings in metres.
///     a: Equatorial radius in metres (default WGS84).
///     f: Flattening (default WGS84).
///
/// Returns:
///     Tuple of (lat, lon, azi, rk) arrays. All four are NaN where the
///     solver did not converge.
#[pyfunction]
#[pyo3(signature = (lat0, lon0, x, y, a=None, f=None))]
pub fn gnomonic_reverse<'py>(
    py: Python<'py>,
    lat0: f64,
    lon0: f64,
    x: PyReadonlyArray1<'py, f64>,
    y: PyReadonlyArray1<'py, f64>,
    a: Option<f64>,
    f: Option<f64>,
) -> PyResult<Columns<'py>> {
    let points = pairs("x", &x, "y", &y)?;
    let projection = build_projection(a, f)?;

    let results: Vec<GnomonicData> = py.detach(move || {
        points
            .par_iter()
            .map(|&(x, y)| projection.reverse(lat0, lon0, x, y))
            .collect()
    });

    Ok(to_columns(py, &results, |r| [r.lat, r.lon, r.azi, r.rk]))
}
