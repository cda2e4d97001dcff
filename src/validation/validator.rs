//! The central validator that runs every rule over every reference.
use super::error::Violation;
use super::rules::{context, cycle, existence, ordering, sanity, Edge};
use crate::analysis::{CycleAnalysis, ProperLevel};
use crate::store::Registry;
use serde::{Serialize, Deserialize};
use tracing::debug;

/// Declared vs. proper level of one key. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDelta {
    pub full_key: String,
    pub declared: u32,
    pub proper: ProperLevel,
}

impl LevelDelta {
    /// `declared - proper`, or `None` when the proper level is a cycle.
    pub fn delta(&self) -> Option<i64> {
        self.proper.value().map(|p| i64::from(self.declared) - i64::from(p))
    }

    pub fn is_mismatch(&self) -> bool { self.delta() != Some(0) }
}

/// The orchestrator for the consistency checks.
///
/// Walks keys in registry order and their references in formula order. For
/// each reference the ordered rules stop at the first one that fires; the
/// cycle rule, when enabled, runs after them on its own.
pub struct Validator<'a> {
    registry: &'a Registry,
    levels: &'a [ProperLevel],
    cycles: Option<&'a CycleAnalysis>,
}

impl<'a> Validator<'a> {
    /// `levels` must be the resolver output for `registry`, in registry order.
    pub fn new(registry: &'a Registry, levels: &'a [ProperLevel]) -> Self {
        debug_assert_eq!(registry.count(), levels.len());
        Self { registry, levels, cycles: None }
    }

    /// Also label references that stay inside a cycle.
    pub fn with_cycles(mut self, cycles: &'a CycleAnalysis) -> Self {
        self.cycles = Some(cycles);
        self
    }

    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for id in self.registry.ids() {
            let subject = self.registry.record(id);

            for reference in self.registry.dependencies(id) {
                let dependency_id = self.registry.lookup(&reference.target);
                let edge = Edge {
                    subject,
                    subject_proper: self.levels[id.index()],
                    reference,
                    dependency: dependency_id.map(|d| self.registry.record(d)),
                };

                let ordered = sanity::check_formula_present(&edge)
                    .or_else(|| existence::check_exists(&edge))
                    .or_else(|| ordering::check_declared_order(&edge))
                    .or_else(|| context::check_context(&edge));
                violations.extend(ordered);

                if let Some(cycles) = self.cycles {
                    violations.extend(cycle::check_cycle(&edge, cycles, id, dependency_id));
                }
            }
        }

        debug!(violations = violations.len(), "Validation finished");
        violations
    }

    /// Declared vs. proper level for every key, in registry order.
    pub fn level_deltas(&self) -> Vec<LevelDelta> {
        self.registry
            .ids()
            .map(|id| LevelDelta {
                full_key: self.registry.record(id).full_key.clone(),
                declared: self.registry.record(id).calculation_level,
                proper: self.levels[id.index()],
            })
            .collect()
    }
}
