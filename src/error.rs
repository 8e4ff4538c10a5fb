use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),
}

impl From<toml::de::Error> for PolicyError {
    fn from(err: toml::de::Error) -> Self {
        PolicyError::Config(err.to_string())
    }
}

impl From<tempfile::PersistError> for PolicyError {
    fn from(err: tempfile::PersistError) -> Self {
        PolicyError::Io(err.error)
    }
}

#[cfg(feature = "python")]
impl From<PolicyError> for pyo3::PyErr {
    fn from(err: PolicyError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PolicyError>;
