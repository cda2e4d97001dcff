use crate::audit::{self, AuditError};
use crate::config::AuditConfig;
use crate::source::{self, MemorySource};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(err: AuditError) -> PyErr {
    match err {
        AuditError::Source(e) => PyValueError::new_err(e.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Audits a JSON array of key records and returns the reports as JSON.
///
/// `config_toml` uses the same keys as the `keyaudit` config file.
#[pyfunction]
#[pyo3(signature = (records_json, config_toml=None))]
pub fn audit_json(records_json: &str, config_toml: Option<&str>) -> PyResult<String> {
    let config = match config_toml {
        Some(toml) => AuditConfig::from_toml(toml)
            .and_then(|c| c.validate().map(|_| c))
            .map_err(|e| PyValueError::new_err(e.to_string()))?,
        None => AuditConfig::default(),
    };

    let records = source::parse_records(records_json).map_err(|e| to_py_err(e.into()))?;
    let reports = audit::run(&MemorySource::new(records), &config).map_err(to_py_err)?;

    serde_json::to_string(&reports).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

#[pyfunction]
pub fn rust_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
