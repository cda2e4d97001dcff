//! Per-edge validation rules, in the order the validator applies them.
use crate::analysis::ProperLevel;
use crate::store::{DependencyRef, KeyRecord};
use super::error::{ProblemKind, Violation};

pub mod context;
pub mod cycle;
pub mod existence;
pub mod ordering;
pub mod sanity;

/// Everything a rule may look at for one reference of one key.
pub(crate) struct Edge<'r> {
    pub subject: &'r KeyRecord,
    pub subject_proper: ProperLevel,
    pub reference: &'r DependencyRef,
    /// The referenced record, if it exists.
    pub dependency: Option<&'r KeyRecord>,
}

impl Edge<'_> {
    pub(crate) fn violation(&self, kind: ProblemKind) -> Violation {
        Violation {
            subject_key: self.subject.full_key.clone(),
            kind,
            dependency_key: self.reference.target.clone(),
            dependency_context: Some(
                self.dependency.map_or(self.reference.expected, |d| d.context()),
            ),
            dependency_level: self.dependency.map(|d| d.calculation_level),
            subject_level: self.subject.calculation_level,
            proper_level: self.subject_proper,
        }
    }
}
