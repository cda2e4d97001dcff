//! Cycle membership via strongly connected components.
//!
//! The resolver only says that a key reaches a cycle. This pass says which
//! keys actually sit on one, so the validator can label the closing edges.

use crate::store::{KeyId, Registry};
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

#[derive(Debug, Clone, Default)]
pub struct CycleAnalysis {
    /// Cyclic components, members in registry order, components ordered by
    /// their first member.
    components: Vec<Vec<KeyId>>,
    /// Index into `components` for keys on a cycle.
    component_of: Vec<Option<usize>>,
}

impl CycleAnalysis {
    /// Builds the key graph (edges point from a key to the keys it references)
    /// and keeps components of size > 1 plus self-referencing keys.
    pub fn analyze(registry: &Registry) -> Self {
        let mut graph: DiGraph<KeyId, ()> = DiGraph::with_capacity(registry.count(), 0);
        let nodes: Vec<_> = registry.ids().map(|id| graph.add_node(id)).collect();

        for id in registry.ids() {
            for dep in registry.dependencies(id) {
                if let Some(target) = registry.lookup(&dep.target) {
                    graph.update_edge(nodes[id.index()], nodes[target.index()], ());
                }
            }
        }

        let mut components: Vec<Vec<KeyId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || graph.contains_edge(scc[0], scc[0])
            })
            .map(|scc| {
                let mut members: Vec<KeyId> = scc.into_iter().map(|n| graph[n]).collect();
                members.sort();
                members
            })
            .collect();
        components.sort_by_key(|members| members[0]);

        let mut component_of = vec![None; registry.count()];
        for (c, members) in components.iter().enumerate() {
            for id in members {
                component_of[id.index()] = Some(c);
            }
        }

        Self { components, component_of }
    }

    pub fn components(&self) -> &[Vec<KeyId>] { &self.components }

    pub fn is_on_cycle(&self, id: KeyId) -> bool {
        self.component_of[id.index()].is_some()
    }

    /// True when `to` is reachable from `from` and vice versa.
    pub fn closes_cycle(&self, from: KeyId, to: KeyId) -> bool {
        match (self.component_of[from.index()], self.component_of[to.index()]) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KeyRecord;

    fn key(name: &str, formula: &str) -> KeyRecord {
        KeyRecord {
            fund_id: "F".into(),
            datagroup_id: "D".into(),
            key: name.into(),
            full_key: format!("F!D!{}!pf", name),
            calculation_level: 1,
            is_current: false,
            formula: Some(formula.into()),
        }
    }

    #[test]
    fn test_components_exclude_keys_behind_a_cycle() {
        let reg = Registry::build(vec![
            key("A", r#""D"!"B"!"pf""#),
            key("B", r#""D"!"A"!"pf""#),
            key("C", r#""D"!"A"!"pf""#), // Depends on the cycle, not on it
            key("S", r#""D"!"S"!"pf""#),
            key("L", "1"),
        ]).unwrap();

        let cycles = CycleAnalysis::analyze(&reg);
        assert_eq!(cycles.components(), &[vec![KeyId(0), KeyId(1)], vec![KeyId(3)]]);
        assert!(cycles.closes_cycle(KeyId(1), KeyId(0)));
        assert!(cycles.closes_cycle(KeyId(3), KeyId(3)));
        assert!(!cycles.closes_cycle(KeyId(2), KeyId(0)));
        assert!(!cycles.is_on_cycle(KeyId(2)));
        assert!(!cycles.is_on_cycle(KeyId(4)));
    }
}
