//! Dependency-derived ("proper") calculation levels.
//!
//! A key without references sits at level 0; otherwise its level is one more
//! than the highest level among its references. References outside the
//! registry count as level 0. A key that reaches a cycle resolves to `Cycle`.

use crate::store::{KeyId, Registry};
use serde::{Serialize, Deserialize};
use std::fmt;
use tracing::{debug, warn};

/// A resolved level, or the marker for keys on or behind a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProperLevel {
    Level(u32),
    Cycle,
}

impl ProperLevel {
    pub fn value(&self) -> Option<u32> {
        match self {
            ProperLevel::Level(l) => Some(*l),
            ProperLevel::Cycle => None,
        }
    }

    pub fn is_cycle(&self) -> bool { matches!(self, ProperLevel::Cycle) }

    /// `max` in which `Cycle` absorbs everything.
    pub fn max(self, other: ProperLevel) -> ProperLevel {
        match (self, other) {
            (ProperLevel::Level(a), ProperLevel::Level(b)) => ProperLevel::Level(a.max(b)),
            _ => ProperLevel::Cycle,
        }
    }

    fn successor(self) -> ProperLevel {
        match self {
            ProperLevel::Level(l) => ProperLevel::Level(l + 1),
            ProperLevel::Cycle => ProperLevel::Cycle,
        }
    }
}

impl fmt::Display for ProperLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProperLevel::Level(l) => write!(f, "{}", l),
            ProperLevel::Cycle => f.write_str("cycle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Unvisited,
    /// On the active traversal path; re-entering it closes a cycle.
    InProgress,
    Finalized(ProperLevel),
}

/// One pending key on the explicit traversal stack.
struct Frame {
    id: KeyId,
    next_dep: usize,
    /// Highest level seen among the references processed so far.
    acc: Option<ProperLevel>,
}

impl Frame {
    fn absorb(&mut self, level: ProperLevel) {
        self.acc = Some(match self.acc {
            Some(acc) => acc.max(level),
            None => level,
        });
    }
}

/// Owns the memo table for a single run over one `Registry`.
pub struct LevelResolver<'a> {
    registry: &'a Registry,
    state: Vec<ResolveState>,
}

impl<'a> LevelResolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry, state: vec![ResolveState::Unvisited; registry.count()] }
    }

    pub fn state(&self, id: KeyId) -> ResolveState { self.state[id.index()] }

    /// Proper level of `full_key`, or `None` when the key is not in the registry.
    pub fn proper_level(&mut self, full_key: &str) -> Option<ProperLevel> {
        let id = self.registry.lookup(full_key)?;
        Some(self.resolve(id))
    }

    /// Resolves `root` with an explicit stack so long chains cannot exhaust
    /// the call stack. Results are memoized for the rest of the run.
    pub fn resolve(&mut self, root: KeyId) -> ProperLevel {
        let registry = self.registry;
        if let ResolveState::Finalized(level) = self.state[root.index()] {
            return level;
        }

        self.state[root.index()] = ResolveState::InProgress;
        let mut stack = vec![Frame { id: root, next_dep: 0, acc: None }];

        while let Some(frame) = stack.last_mut() {
            let deps = registry.dependencies(frame.id);

            if frame.next_dep == deps.len() {
                let level = match frame.acc {
                    Some(max) => max.successor(),
                    None => ProperLevel::Level(0),
                };
                let id = frame.id;
                self.state[id.index()] = ResolveState::Finalized(level);
                stack.pop();
                if let Some(parent) = stack.last_mut() {
                    parent.absorb(level);
                }
                continue;
            }

            let dep = &deps[frame.next_dep];
            frame.next_dep += 1;

            let Some(dep_id) = registry.lookup(&dep.target) else {
                frame.absorb(ProperLevel::Level(0));
                continue;
            };

            match self.state[dep_id.index()] {
                ResolveState::Finalized(level) => frame.absorb(level),
                ResolveState::InProgress => {
                    debug!(key = %registry.record(frame.id).full_key, dependency = %dep.target, "Cycle closed");
                    frame.absorb(ProperLevel::Cycle);
                }
                ResolveState::Unvisited => {
                    self.state[dep_id.index()] = ResolveState::InProgress;
                    stack.push(Frame { id: dep_id, next_dep: 0, acc: None });
                }
            }
        }

        match self.state[root.index()] {
            ResolveState::Finalized(level) => level,
            // The loop always finalizes the root before the stack empties.
            _ => unreachable!("root left unresolved"),
        }
    }

    /// Resolves every key, in registry order.
    pub fn resolve_all(&mut self) -> Vec<ProperLevel> {
        let registry = self.registry;
        let levels: Vec<ProperLevel> = registry.ids().map(|id| self.resolve(id)).collect();

        let cyclic = levels.iter().filter(|l| l.is_cycle()).count();
        if cyclic > 0 {
            warn!(cyclic, "Keys resolving to a dependency cycle");
        }
        debug!(keys = levels.len(), "Proper levels resolved");
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KeyRecord;

    /// `(key, declared_level, formula)` within fund `F` and datagroup `D`.
    fn registry(keys: &[(&str, u32, Option<&str>)]) -> Registry {
        let records = keys
            .iter()
            .map(|&(key, level, formula)| KeyRecord {
                fund_id: "F".into(),
                datagroup_id: "D".into(),
                key: key.into(),
                full_key: format!("F!D!{}!current", key),
                calculation_level: level,
                is_current: true,
                formula: formula.map(Into::into),
            })
            .collect();
        Registry::build(records).unwrap()
    }

    fn r(key: &str) -> String { format!(r#""D"!"{}"!"current""#, key) }

    fn level(reg: &Registry, key: &str) -> ProperLevel {
        LevelResolver::new(reg).proper_level(&format!("F!D!{}!current", key)).unwrap()
    }

    #[test]
    fn test_leaf_is_level_zero() {
        let reg = registry(&[("A", 0, None), ("B", 0, Some("12 * 3"))]);
        assert_eq!(level(&reg, "A"), ProperLevel::Level(0));
        assert_eq!(level(&reg, "B"), ProperLevel::Level(0));
    }

    #[test]
    fn test_diamond_takes_longest_chain() {
        let (a, b, c) = (r("A"), r("B"), r("C"));
        let reg = registry(&[
            ("A", 0, None),
            ("B", 1, Some(a.as_str())),
            ("C", 2, Some(b.as_str())),
            ("D", 3, Some(&*format!("{} + {}", a, c))),
        ]);
        assert_eq!(level(&reg, "D"), ProperLevel::Level(3));
        assert_eq!(level(&reg, "B"), ProperLevel::Level(1));
    }

    #[test]
    fn test_missing_reference_counts_as_level_zero() {
        let reg = registry(&[("K3", 1, Some(&*r("K9")))]);
        assert_eq!(level(&reg, "K3"), ProperLevel::Level(1));
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let reg = registry(&[("A", 0, None)]);
        assert_eq!(LevelResolver::new(&reg).proper_level("F!D!Z!current"), None);
    }

    #[test]
    fn test_cycle_propagates_to_dependents() {
        let reg = registry(&[
            ("A", 1, Some(&*r("B"))),
            ("B", 1, Some(&*r("A"))),
            ("C", 2, Some(&*r("A"))),
            ("E", 0, None),
        ]);
        let mut resolver = LevelResolver::new(&reg);
        assert_eq!(
            resolver.resolve_all(),
            vec![ProperLevel::Cycle, ProperLevel::Cycle, ProperLevel::Cycle, ProperLevel::Level(0)]
        );
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let reg = registry(&[("A", 1, Some(&*r("A")))]);
        assert_eq!(level(&reg, "A"), ProperLevel::Cycle);
    }

    #[test]
    fn test_states_progress_to_finalized() {
        let reg = registry(&[("A", 0, None), ("B", 1, Some(&*r("A")))]);
        let mut resolver = LevelResolver::new(&reg);
        assert_eq!(resolver.state(KeyId(0)), ResolveState::Unvisited);
        resolver.resolve(KeyId(1));
        assert_eq!(resolver.state(KeyId(0)), ResolveState::Finalized(ProperLevel::Level(0)));
        assert_eq!(resolver.state(KeyId(1)), ResolveState::Finalized(ProperLevel::Level(1)));
    }

    #[test]
    fn test_levels_independent_of_query_order() {
        let (a, b, c, d) = (r("A"), r("B"), r("C"), r("D"));
        let reg = registry(&[
            ("A", 0, None),
            ("B", 1, Some(a.as_str())),
            ("C", 2, Some(&*format!("{} {}", b, d))),
            ("D", 2, Some(c.as_str())),
            ("E", 3, Some(d.as_str())),
            ("G", 2, Some(&*format!("{} {} {}", b, a, r("Missing")))),
            ("H", 1, Some(b.as_str())),
        ]);

        let baseline = LevelResolver::new(&reg).resolve_all();
        let ids: Vec<KeyId> = reg.ids().collect();

        // Every rotation plus the reverse order.
        let mut orders: Vec<Vec<KeyId>> = (0..ids.len())
            .map(|k| ids.iter().cycle().skip(k).take(ids.len()).copied().collect())
            .collect();
        orders.push(ids.iter().rev().copied().collect());

        for order in orders {
            let mut resolver = LevelResolver::new(&reg);
            for &id in &order {
                resolver.resolve(id);
            }
            let levels: Vec<ProperLevel> = ids.iter().map(|&id| resolver.resolve(id)).collect();
            assert_eq!(levels, baseline, "order {:?}", order);
        }

        assert_eq!(baseline[0], ProperLevel::Level(0));
        assert_eq!(baseline[1], ProperLevel::Level(1));
        assert!(baseline[2].is_cycle() && baseline[3].is_cycle() && baseline[4].is_cycle());
        assert_eq!(baseline[5], ProperLevel::Level(2));
        assert_eq!(baseline[6], ProperLevel::Level(2));
    }

    #[test]
    fn test_levels_follow_one_plus_max_of_dependencies() {
        let (a, b) = (r("A"), r("B"));
        let reg = registry(&[
            ("A", 0, None),
            ("B", 1, Some(a.as_str())),
            ("C", 1, Some(&*format!("{} * {} / {}", a, b, a))),
            ("X", 1, Some(&*r("Y"))),
            ("Y", 1, Some(&*r("X"))),
        ]);
        let mut resolver = LevelResolver::new(&reg);
        let levels = resolver.resolve_all();

        for id in reg.ids() {
            if levels[id.index()].is_cycle() {
                continue;
            }
            let expected = reg
                .dependencies(id)
                .iter()
                .map(|d| reg.lookup(&d.target).map_or(ProperLevel::Level(0), |t| levels[t.index()]))
                .reduce(ProperLevel::max)
                .map_or(ProperLevel::Level(0), |m| m.successor());
            assert_eq!(levels[id.index()], expected);
        }
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let formulas: Vec<String> = (0..20_000).map(|i| r(&format!("K{}", i))).collect();
        let names: Vec<String> = (0..=20_000).map(|i| format!("K{}", i)).collect();
        let keys: Vec<(&str, u32, Option<&str>)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i as u32, if i == 0 { None } else { Some(formulas[i - 1].as_str()) }))
            .collect();
        let reg = registry(&keys);
        assert_eq!(level(&reg, "K20000"), ProperLevel::Level(20_000));
    }
}
