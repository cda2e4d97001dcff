//! Calculation-level and context audit for calculated fund keys.
//!
//! A run materializes a `store::Registry` from a record source, resolves the
//! proper level of every key from its formula references, and checks the
//! declared metadata against them. Results come back as plain data in
//! `report::AuditReport`.

pub mod analysis;
pub mod audit;
pub mod config;
pub mod report;
pub mod source;
pub mod store;
pub mod validation;

#[cfg(feature = "python")]
pub mod bindings {
    pub mod python;
}

pub use audit::{audit_by_fund, audit_records, run, AuditError};
pub use config::AuditConfig;
pub use report::AuditReport;

// FFI Facade: the `_core` Python module, built with maturin.
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The name `_core` marks it as the internal, compiled component.
#[cfg(feature = "python")]
#[pymodule]
fn _core(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(bindings::python::rust_core_version, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::python::audit_json, m)?)?;
    Ok(())
}
