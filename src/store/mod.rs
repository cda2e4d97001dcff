//! Data model and the per-run key registry.
pub mod registry;
pub mod types;

pub use registry::{Registry, RegistryError};
pub use types::{Context, DependencyList, DependencyRef, KeyId, KeyRecord};
