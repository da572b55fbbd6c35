use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeodesicError {
    #[error("Invalid ellipsoid: {0}")]
    InvalidEllipsoid(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjError {
    #[error("Geodesic error: {0}")]
    Geodesic(#[from] GeodesicError),

    #[error("Point outside gnomonic domain: {0}")]
    OutsideDomain(String),

    #[error("Reverse projection did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
