//! Structured results of an audit run and a plain-text rendering of them.

use crate::analysis::ProperLevel;
use crate::config::AuditConfig;
use crate::store::Registry;
use crate::validation::{LevelDelta, ProblemKind, Violation};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub keys: usize,
    /// Level 0 and no formula.
    pub raw_keys: usize,
    /// Declared above level 0.
    pub calculated_keys: usize,
    /// Declared above level 0 but without a formula.
    pub missing_formula: usize,
    /// Keys whose proper level is a cycle.
    pub cyclic_keys: usize,
    pub level_mismatches: usize,
    pub violations_by_kind: BTreeMap<ProblemKind, usize>,
}

impl Summary {
    pub fn collect(registry: &Registry, levels: &[ProperLevel], violations: &[Violation]) -> Self {
        let mut summary = Summary { keys: registry.count(), ..Default::default() };

        for (record, level) in registry.records().iter().zip(levels) {
            match (record.calculation_level, record.formula.is_some()) {
                (0, false) => summary.raw_keys += 1,
                (0, true) => {}
                (_, has_formula) => {
                    summary.calculated_keys += 1;
                    if !has_formula {
                        summary.missing_formula += 1;
                    }
                }
            }
            if level.is_cycle() {
                summary.cyclic_keys += 1;
            }
            if level.value() != Some(record.calculation_level) {
                summary.level_mismatches += 1;
            }
        }

        for v in violations {
            *summary.violations_by_kind.entry(v.kind).or_insert(0) += 1;
        }
        summary
    }

    pub fn total_violations(&self) -> usize { self.violations_by_kind.values().sum() }
}

/// Outcome of one run: the proper-level table, the ordered violations, and
/// the keys found on cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Set when the run covered a single fund.
    pub fund_id: Option<String>,
    /// Every key with its declared and proper level, in input order.
    pub levels: Vec<LevelDelta>,
    pub violations: Vec<Violation>,
    /// Full keys of each cycle.
    pub cycles: Vec<Vec<String>>,
    pub summary: Summary,
}

impl AuditReport {
    pub fn proper_level(&self, full_key: &str) -> Option<ProperLevel> {
        self.levels.iter().find(|l| l.full_key == full_key).map(|l| l.proper)
    }

    /// Keys whose declared level differs from the proper one.
    pub fn level_mismatches(&self) -> impl Iterator<Item = &LevelDelta> {
        self.levels.iter().filter(|l| l.is_mismatch())
    }

    pub fn visible_violations<'r>(&'r self, config: &'r AuditConfig) -> impl Iterator<Item = &'r Violation> {
        self.violations
            .iter()
            .filter(move |v| !config.is_suppressed(&v.dependency_key))
    }

    pub fn is_clean(&self) -> bool { self.violations.is_empty() }

    /// Numbered violation lines, then level mismatches, cycles and totals.
    pub fn render_text(&self, config: &AuditConfig, show_suppressed: bool) -> String {
        let mut out = String::new();
        if let Some(fund) = &self.fund_id {
            let _ = writeln!(out, "== Fund {}", fund);
        }

        let violations: Vec<&Violation> = if show_suppressed {
            self.violations.iter().collect()
        } else {
            self.visible_violations(config).collect()
        };

        if violations.is_empty() {
            let _ = writeln!(out, "All calculation levels and contexts are valid.");
        }
        for (i, v) in violations.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, v);
        }

        let mismatches: Vec<&LevelDelta> = self.level_mismatches().collect();
        if !mismatches.is_empty() {
            let _ = writeln!(out, "\nLevel mismatches ({}):", mismatches.len());
            for (i, m) in mismatches.iter().enumerate() {
                let _ = writeln!(out, "{}. {} declared {} proper {}", i + 1, m.full_key, m.declared, m.proper);
            }
        }

        if !self.cycles.is_empty() {
            let _ = writeln!(out, "\nCycles ({}):", self.cycles.len());
            for members in &self.cycles {
                let _ = writeln!(out, "- {}", members.join(" <-> "));
            }
        }

        let s = &self.summary;
        let _ = writeln!(
            out,
            "\nKeys: {} (raw {}, calculated {}, missing formula {}, cyclic {}), level mismatches: {}, violations: {}",
            s.keys, s.raw_keys, s.calculated_keys, s.missing_formula, s.cyclic_keys,
            s.level_mismatches, s.total_violations()
        );
        for (kind, count) in &s.violations_by_kind {
            let _ = writeln!(out, "  {}: {}", kind, count);
        }
        out
    }
}
