//! Graph analyses over a key registry.
pub mod cycles;
pub mod extract;
pub mod levels;

pub use cycles::CycleAnalysis;
pub use extract::{extract, RawReference, ReferenceScanner};
pub use levels::{LevelResolver, ProperLevel, ResolveState};
