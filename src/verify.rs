//! Acyclic verification of the provider hypergraph.
//!
//! Nodes are providers; a directed edge runs from a provider that produces
//! a key to every provider that demands it (a dependent can only be built
//! after its dependencies, so the edge points from dependency to
//! dependent — same orientation a topological build order would use).
//! Three-color DFS finds a cycle if one exists, either rooted at a single
//! newly-registered provider (the eager check `provide`/`try_provide` runs
//! by default) or over the whole graph (the lazy check `invoke` runs once,
//! memoized, when `defer_acyclic_verification` is set).

use crate::registry::{ProviderId, Registry};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

pub struct Cycle {
    path: Vec<ProviderId>,
}

impl Cycle {
    pub fn describe(&self, registry: &Registry) -> String {
        self.path
            .iter()
            .map(|id| format!("{:?}", registry.provider(*id).location))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

pub struct Verifier<'a> {
    registry: &'a Registry,
}

impl<'a> Verifier<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Verifier { registry }
    }

    /// Eager check: is there a cycle reachable starting from `root`?
    /// `provide`/`try_provide` call this rooted at the just-inserted
    /// provider, since any cycle must pass through the newest node.
    pub fn find_cycle_from(&self, root: ProviderId) -> Option<Cycle> {
        let mut color = vec![Color::White; self.registry.nodes().len()];
        let mut path = Vec::new();
        self.dfs(root, &mut color, &mut path)
    }

    /// Lazy check: is there a cycle anywhere in the graph?
    pub fn find_cycle_anywhere(&self) -> Option<Cycle> {
        let mut color = vec![Color::White; self.registry.nodes().len()];
        for node in self.registry.nodes() {
            if color[node.id.0 as usize] == Color::White {
                let mut path = Vec::new();
                if let Some(cycle) = self.dfs(node.id, &mut color, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs(&self, id: ProviderId, color: &mut [Color], path: &mut Vec<ProviderId>) -> Option<Cycle> {
        color[id.0 as usize] = Color::Gray;
        path.push(id);

        for dependent in self.registry.producers_for_each_demand(id) {
            match color[dependent.0 as usize] {
                Color::White => {
                    if let Some(cycle) = self.dfs(dependent, color, path) {
                        return Some(cycle);
                    }
                }
                Color::Gray => {
                    let mut cycle_path = path.clone();
                    cycle_path.push(dependent);
                    return Some(Cycle { path: cycle_path });
                }
                Color::Black => {}
            }
        }

        path.pop();
        color[id.0 as usize] = Color::Black;
        None
    }
}
