//! Violation records produced by the consistency validator.
use crate::analysis::ProperLevel;
use crate::store::Context;
use serde::{Serialize, Deserialize};
use std::fmt;

/// The specific category of a violation.
///
// Kept as an enum so callers can aggregate by kind without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// A computed key without a formula, or a dependency whose declared level
    /// is not strictly below the subject's.
    InvalidCalculationOrder,
    /// The referenced key is not in the registry.
    MissingDependency,
    /// The reference asks for `current` but the dependency is point-in-time.
    ExpectedCurrentButPf,
    /// The reference asks for `pf` but the dependency is current.
    ExpectedPfButCurrent,
    /// The reference stays inside a dependency cycle.
    CyclicDependency,
}

impl ProblemKind {
    pub const ALL: [ProblemKind; 5] = [
        ProblemKind::InvalidCalculationOrder,
        ProblemKind::MissingDependency,
        ProblemKind::ExpectedCurrentButPf,
        ProblemKind::ExpectedPfButCurrent,
        ProblemKind::CyclicDependency,
    ];

    pub fn describe(&self) -> &'static str {
        match self {
            ProblemKind::InvalidCalculationOrder => "Invalid calculation order",
            ProblemKind::MissingDependency => "Missing dependency",
            ProblemKind::ExpectedCurrentButPf => "Expected current but dependency is pf",
            ProblemKind::ExpectedPfButCurrent => "Expected pf but dependency is current",
            ProblemKind::CyclicDependency => "Cyclic dependency",
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One inconsistency between a key's declared metadata and what its
/// references require.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub subject_key: String,
    pub kind: ProblemKind,
    pub dependency_key: String,
    /// The dependency's actual context, or the requested one when missing.
    pub dependency_context: Option<Context>,
    /// Declared level of the dependency; `None` when it is missing.
    pub dependency_level: Option<u32>,
    pub subject_level: u32,
    pub proper_level: ProperLevel,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [level {}] -> {} -> {}",
            self.subject_key, self.subject_level, self.kind, self.dependency_key
        )?;
        match self.dependency_level {
            Some(level) => write!(f, " [level {}]", level)?,
            None => f.write_str(" [level none]")?,
        }
        write!(f, " -> [proper level {}]", self.proper_level)
    }
}
