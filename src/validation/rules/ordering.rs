//! "Lower levels first": a key may only depend on keys declared strictly below it.
//!
//! Declared levels only. The gap between declared and proper level is reported
//! separately and never raises a violation.

use super::Edge;
use crate::validation::error::{ProblemKind, Violation};

/// Level-0 subjects are exempt.
pub(crate) fn check_declared_order(edge: &Edge<'_>) -> Option<Violation> {
    let dependency = edge.dependency?;
    let subject_level = edge.subject.calculation_level;

    (subject_level != 0 && dependency.calculation_level >= subject_level)
        .then(|| edge.violation(ProblemKind::InvalidCalculationOrder))
}
