//! Module dependency graph and cycle breaking
//!
//! The closures of all modules feed a name-keyed adjacency map. Every edge
//! that participates in any directed cycle is collected and demoted to a
//! binary reference; what remains is guaranteed acyclic and can use project
//! references. This is deliberately broader than a minimum feedback edge
//! set: more edges than strictly necessary get the weaker reference kind, in
//! exchange for a simple traversal and a guaranteed-acyclic result.

use std::hash::Hash;

use log::warn;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::analysis::ModuleClosure;
use crate::symbols::Universe;
use crate::types::{FxIndexMap, FxIndexSet, ReferenceKind};

/// Collect every edge lying on a directed cycle.
///
/// For each start node, a depth-first walk holds the current path as an
/// explicit stack. When an edge closes back onto the path at position `k`,
/// every edge from `k` to the top participates in that cycle and is recorded;
/// the walk does not recurse past a closing edge. No memoization is shared
/// across start nodes, so dense graphs are exponential in the worst case;
/// acceptable for real module graphs, which are sparse.
pub fn cycle_edges<T>(adjacency: &FxIndexMap<T, FxIndexSet<T>>) -> FxIndexSet<(T, T)>
where
    T: Clone + Eq + Hash,
{
    fn visit<T: Clone + Eq + Hash>(
        adjacency: &FxIndexMap<T, FxIndexSet<T>>,
        path: &mut Vec<T>,
        current: &T,
        edges: &mut FxIndexSet<(T, T)>,
    ) {
        let Some(dependencies) = adjacency.get(current) else {
            return;
        };
        for dependency in dependencies {
            if let Some(k) = path.iter().position(|node| node == dependency) {
                // The path from k to the top plus this edge is a cycle.
                for i in k..path.len() - 1 {
                    edges.insert((path[i].clone(), path[i + 1].clone()));
                }
                edges.insert((current.clone(), dependency.clone()));
            } else {
                path.push(dependency.clone());
                visit(adjacency, path, dependency, edges);
                path.pop();
            }
        }
    }

    let mut edges = FxIndexSet::default();
    for start in adjacency.keys() {
        let mut path = vec![start.clone()];
        visit(adjacency, &mut path, start, &mut edges);
    }
    edges
}

/// Name-keyed module dependency graph with cycle-edge classification. Built
/// once, after every module's closure pass has finished, then read-only.
#[derive(Debug)]
pub struct ModuleGraph {
    adjacency: FxIndexMap<String, FxIndexSet<String>>,
    cycle_edges: FxIndexSet<(String, String)>,
}

impl ModuleGraph {
    pub fn build(universe: &Universe, closures: &[ModuleClosure]) -> Self {
        let mut adjacency: FxIndexMap<String, FxIndexSet<String>> = FxIndexMap::default();
        for closure in closures {
            let dependent = universe.module(closure.module).name.clone();
            let dependencies = adjacency.entry(dependent).or_default();
            for &dependency in &closure.module_deps {
                dependencies.insert(universe.module(dependency).name.clone());
            }
        }

        let cycle_edges = cycle_edges(&adjacency);
        ModuleGraph {
            adjacency,
            cycle_edges,
        }
    }

    pub fn adjacency(&self) -> &FxIndexMap<String, FxIndexSet<String>> {
        &self.adjacency
    }

    pub fn cycle_edges(&self) -> &FxIndexSet<(String, String)> {
        &self.cycle_edges
    }

    /// Reference kind for an edge: binary when the edge lies on a cycle,
    /// project otherwise.
    pub fn reference_kind(&self, dependent: &str, dependency: &str) -> ReferenceKind {
        if self
            .cycle_edges
            .contains(&(dependent.to_string(), dependency.to_string()))
        {
            ReferenceKind::Binary
        } else {
            ReferenceKind::Project
        }
    }

    /// Dependencies-first generation order over the graph with cycle edges
    /// removed. Removing all cycle edges leaves an acyclic graph, so the sort
    /// cannot fail; if it somehow does the insertion order is kept.
    pub fn generation_order(&self) -> Vec<String> {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut index_by_name: FxIndexMap<&str, NodeIndex> = FxIndexMap::default();
        for name in self.adjacency.keys() {
            index_by_name.insert(name.as_str(), graph.add_node(name.clone()));
        }

        for (dependent, dependencies) in &self.adjacency {
            for dependency in dependencies {
                if self
                    .cycle_edges
                    .contains(&(dependent.clone(), dependency.clone()))
                {
                    continue;
                }
                // Edges to modules outside the analyzed set have no node.
                let (Some(&from), Some(&to)) = (
                    index_by_name.get(dependent.as_str()),
                    index_by_name.get(dependency.as_str()),
                ) else {
                    continue;
                };
                graph.add_edge(from, to, ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => {
                // toposort yields dependents before dependencies; generation
                // wants dependencies first.
                order
                    .into_iter()
                    .rev()
                    .map(|index| graph[index].clone())
                    .collect()
            }
            Err(_) => {
                warn!("module graph still cyclic after cycle-edge removal; keeping input order");
                self.adjacency.keys().cloned().collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn adjacency(edges: &[(&str, &[&str])]) -> FxIndexMap<String, FxIndexSet<String>> {
        edges
            .iter()
            .map(|(node, deps)| {
                (
                    (*node).to_string(),
                    deps.iter().map(|d| (*d).to_string()).collect(),
                )
            })
            .collect()
    }

    fn edge(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn triangle_reports_all_three_edges() {
        let map = adjacency(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
        let edges = cycle_edges(&map);
        assert_eq!(edges.len(), 3);
        assert!(edges.contains(&edge("A", "B")));
        assert!(edges.contains(&edge("B", "C")));
        assert!(edges.contains(&edge("C", "A")));
    }

    #[test]
    fn chain_reports_no_edges() {
        let map = adjacency(&[("A", &["B"]), ("B", &["C"])]);
        assert!(cycle_edges(&map).is_empty());
    }

    #[test]
    fn self_loop_is_a_cycle_edge() {
        let map = adjacency(&[("A", &["A"])]);
        let edges = cycle_edges(&map);
        assert_eq!(edges.into_iter().collect::<Vec<_>>(), vec![edge("A", "A")]);
    }

    #[test]
    fn branch_into_cycle_spares_the_entry_edge() {
        // D -> A -> B -> A: only the A/B edges cycle, D's entry edge is safe.
        let map = adjacency(&[("D", &["A"]), ("A", &["B"]), ("B", &["A"])]);
        let edges = cycle_edges(&map);
        assert_eq!(edges.len(), 2);
        assert!(edges.contains(&edge("A", "B")));
        assert!(edges.contains(&edge("B", "A")));
        assert!(!edges.contains(&edge("D", "A")));
    }

    #[test]
    fn two_cycles_sharing_a_node_report_all_their_edges() {
        let map = adjacency(&[("A", &["B", "C"]), ("B", &["A"]), ("C", &["A"])]);
        let edges = cycle_edges(&map);
        assert_eq!(edges.len(), 4);
        for (a, b) in [("A", "B"), ("B", "A"), ("A", "C"), ("C", "A")] {
            assert!(edges.contains(&edge(a, b)), "missing edge {a} -> {b}");
        }
    }

    #[test]
    fn removing_cycle_edges_leaves_an_acyclic_graph() {
        let map = adjacency(&[
            ("A", &["B"]),
            ("B", &["C", "D"]),
            ("C", &["A"]),
            ("D", &[]),
        ]);
        let edges = cycle_edges(&map);

        // Rebuild without the reported edges and retry: no edges remain on a
        // cycle.
        let pruned: FxIndexMap<String, FxIndexSet<String>> = map
            .iter()
            .map(|(node, deps)| {
                (
                    node.clone(),
                    deps.iter()
                        .filter(|dep| !edges.contains(&(node.clone(), (*dep).clone())))
                        .cloned()
                        .collect(),
                )
            })
            .collect();
        assert!(cycle_edges(&pruned).is_empty());
    }
}
