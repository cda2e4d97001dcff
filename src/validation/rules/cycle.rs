//! Labels references that stay inside a dependency cycle.

use super::Edge;
use crate::analysis::CycleAnalysis;
use crate::store::KeyId;
use crate::validation::error::{ProblemKind, Violation};

/// Runs independently of the ordered checks: a cyclic edge is reported even
/// when one of them already fired for it.
pub(crate) fn check_cycle(
    edge: &Edge<'_>,
    cycles: &CycleAnalysis,
    subject: KeyId,
    dependency: Option<KeyId>,
) -> Option<Violation> {
    let dependency = dependency?;
    cycles
        .closes_cycle(subject, dependency)
        .then(|| edge.violation(ProblemKind::CyclicDependency))
}
