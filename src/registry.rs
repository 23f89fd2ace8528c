//! The provider registry: the set of known constructors, keyed by what
//! they produce, with uniqueness enforced for single-valued keys and free
//! accumulation for grouped ones.

use std::cell::Cell;
use std::collections::HashMap;
use std::panic::Location;

use crate::engine::{Engine, Staging};
use crate::error::{DiError, Result};
use crate::key::Key;
use crate::reflect::{ParamNode, ResultNode};
use crate::verify::Verifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(pub(crate) u32);

pub(crate) type Constructor = Box<dyn Fn(&mut Engine<'_>, &mut Staging) -> Result<()>>;

pub struct Provider {
    pub id: ProviderId,
    pub location: &'static Location<'static>,
    pub param_tree: ParamNode,
    pub result_tree: ResultNode,
    pub(crate) constructor: Constructor,
    pub(crate) called: Cell<bool>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("called", &self.called.get())
            .finish()
    }
}

#[derive(Default)]
pub struct Registry {
    nodes: Vec<Provider>,
    by_key: HashMap<Key, Vec<ProviderId>, ahash::RandomState>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn provider(&self, id: ProviderId) -> &Provider {
        &self.nodes[id.0 as usize]
    }

    pub fn nodes(&self) -> &[Provider] {
        &self.nodes
    }

    pub fn single_provider(&self, key: &Key) -> Option<ProviderId> {
        self.by_key.get(key).and_then(|ids| ids.first().copied())
    }

    pub fn group_providers(&self, key: &Key) -> Vec<ProviderId> {
        self.by_key.get(key).cloned().unwrap_or_default()
    }

    pub fn known_keys(&self) -> impl Iterator<Item = &Key> {
        self.by_key.keys()
    }

    fn producers_of(&self, key: &Key) -> Vec<ProviderId> {
        self.by_key.get(key).cloned().unwrap_or_default()
    }

    /// Every provider whose demands include `key` (used by the acyclic
    /// verifier to find a provider's dependents — not its dependencies).
    pub(crate) fn producers_for_each_demand(&self, id: ProviderId) -> Vec<ProviderId> {
        let provider = self.provider(id);
        let mut out = Vec::new();
        for (leaf_key, _optional) in provider.param_tree.leaves() {
            out.extend(self.producers_of(leaf_key));
        }
        out
    }

    /// Register `provider`, returning its id, or a [`DiError`] if
    /// registration is rejected. `defer_acyclic_verification` controls
    /// whether the (possibly expensive) full-graph DFS runs now or is left
    /// for the caller to run before the next `invoke`.
    pub(crate) fn register(
        &mut self,
        location: &'static Location<'static>,
        param_tree: ParamNode,
        result_tree: ResultNode,
        constructor: Constructor,
        defer_acyclic_verification: bool,
    ) -> Result<ProviderId> {
        let leaves = result_tree.leaves();
        if leaves.is_empty() {
            return Err(DiError::EmptyConstructor { location });
        }

        let mut seen_within = std::collections::HashSet::new();
        for key in &leaves {
            if !seen_within.insert((*key).clone()) {
                return Err(DiError::DuplicateWithinNode {
                    key: (*key).clone(),
                    path: Vec::new(),
                });
            }
        }

        for key in &leaves {
            if !key.is_group() {
                if let Some(existing) = self.by_key.get(key) {
                    if !existing.is_empty() {
                        return Err(DiError::DuplicateAcrossProviders { key: (*key).clone() });
                    }
                }
            }
        }

        let id = ProviderId(self.nodes.len() as u32);
        self.nodes.push(Provider {
            id,
            location,
            param_tree,
            result_tree,
            constructor,
            called: Cell::new(false),
        });
        for key in leaves {
            self.by_key.entry(key.clone()).or_default().push(id);
        }

        if !defer_acyclic_verification {
            if let Some(cycle) = Verifier::new(self).find_cycle_from(id) {
                self.rollback(id);
                return Err(DiError::Cycle {
                    location,
                    cycle: cycle.describe(self),
                });
            }
        }

        Ok(id)
    }

    /// Remove a just-registered provider entirely (used when registration
    /// must be rolled back after an eager cycle check fails).
    fn rollback(&mut self, id: ProviderId) {
        let provider = self.nodes.pop().expect("rollback of freshly pushed node");
        debug_assert_eq!(provider.id, id);
        for key in provider.result_tree.leaves() {
            if let Some(ids) = self.by_key.get_mut(key) {
                ids.retain(|&existing| existing != id);
                if ids.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
    }

    pub(crate) fn verify_all_acyclic(&self) -> std::result::Result<(), crate::verify::Cycle> {
        Verifier::new(self).find_cycle_anywhere().map_or(Ok(()), Err)
    }

    /// Shallow dependency check: every non-optional, non-grouped leaf in
    /// `tree` must have a registered provider. Grouped leaves are never
    /// missing (an empty group is legal). Accumulates every offending key
    /// instead of stopping at the first one, so a caller with several
    /// missing dependencies sees all of them in a single error.
    pub(crate) fn check_shallow_deps(&self, tree: &ParamNode) -> Result<()> {
        let missing: Vec<Key> = tree
            .leaves()
            .into_iter()
            .filter(|(key, optional)| !optional && !key.is_group() && self.single_provider(key).is_none())
            .map(|(key, _)| key.clone())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DiError::MissingDeps { keys: missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;

    #[test]
    fn second_singleton_for_same_type_is_rejected() {
        let container = Container::new();
        container.provide(|| 1u32).unwrap();
        let err = container.provide(|| 2u32).unwrap_err();
        assert!(matches!(err, DiError::DuplicateAcrossProviders { .. }));
    }

    #[test]
    fn group_contributions_accumulate() {
        let container = Container::new();
        container.provide_group::<u32>("g", || 1u32).unwrap();
        container.provide_group::<u32>("g", || 2u32).unwrap();
        let mut values: Vec<u32> = container
            .resolve_group::<u32>("g")
            .unwrap()
            .iter()
            .map(|v| **v)
            .collect();
        values.sort();
        assert_eq!(values, vec![1, 2]);
    }
}
