//! Consistency checks of declared metadata against the dependency graph.
pub mod error;
pub mod validator;
mod rules;

pub use error::{ProblemKind, Violation};
pub use validator::{LevelDelta, Validator};
