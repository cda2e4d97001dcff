//! A key declared above level 0 must carry a formula.

use super::Edge;
use crate::validation::error::{ProblemKind, Violation};

/// Fires on every edge of a computed key whose formula is absent, ahead of
/// any dependency-specific check.
pub(crate) fn check_formula_present(edge: &Edge<'_>) -> Option<Violation> {
    let subject = edge.subject;
    (subject.calculation_level != 0 && subject.formula.is_none())
        .then(|| edge.violation(ProblemKind::InvalidCalculationOrder))
}
