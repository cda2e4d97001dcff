//! Every reference must resolve inside the registry.

use super::Edge;
use crate::validation::error::{ProblemKind, Violation};

/// Reports the requested context, since the dependency has none of its own.
pub(crate) fn check_exists(edge: &Edge<'_>) -> Option<Violation> {
    edge.dependency
        .is_none()
        .then(|| edge.violation(ProblemKind::MissingDependency))
}
