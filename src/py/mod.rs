use pyo3::prelude::*;

mod gnomonic;

/// Register all Python-visible functions.
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(gnomonic::gnomonic_forward, m)?)?;
    m.add_function(wrap_pyfunction!(gnomonic::gnomonic_reverse, m)?)?;
    Ok(())
}
