//! The context tag of a reference must match the dependency's `is_current` flag.

use super::Edge;
use crate::store::Context;
use crate::validation::error::{ProblemKind, Violation};

pub(crate) fn check_context(edge: &Edge<'_>) -> Option<Violation> {
    let dependency = edge.dependency?;

    match (edge.reference.expected, dependency.is_current) {
        (Context::Current, false) => Some(edge.violation(ProblemKind::ExpectedCurrentButPf)),
        (Context::PointInTime, true) => Some(edge.violation(ProblemKind::ExpectedPfButCurrent)),
        _ => None,
    }
}
