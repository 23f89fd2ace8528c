//! The instantiation engine: memoized, staged construction of provider
//! outputs.
//!
//! Every call into [`Engine::require`]/[`Engine::require_group`] either
//! returns an already-memoized value or drives exactly one provider's
//! `Call` protocol: build that provider's own parameters (recursing into
//! the engine), call its constructor, and commit everything the
//! constructor produced into the container's value/group maps — all at
//! once, only on success. A constructor that panics or returns an error
//! leaves the container's committed state untouched, so a failed `invoke`
//! can be retried after fixing whatever was missing.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::error::{DiError, Result};
use crate::key::Key;
use crate::registry::Registry;

type AnyArc = Arc<dyn Any + Send + Sync>;
type ValueMap = HashMap<Key, AnyArc, ahash::RandomState>;
type GroupMap = HashMap<Key, Vec<AnyArc>, ahash::RandomState>;

/// A single provider call's pending outputs, committed to the container's
/// maps only after the whole call succeeds.
#[derive(Default)]
pub struct Staging {
    singles: Vec<(Key, AnyArc)>,
    groups: Vec<(Key, AnyArc)>,
}

impl Staging {
    pub fn push_single(&mut self, key: Key, value: AnyArc) {
        self.singles.push((key, value));
    }

    pub fn push_group(&mut self, key: Key, value: AnyArc) {
        self.groups.push((key, value));
    }
}

/// Borrowed view of the container's mutable state, handed to `Param`/
/// `ResultSet` implementations while a provider call is in flight.
pub struct Engine<'a> {
    registry: &'a Registry,
    values: &'a mut ValueMap,
    groups: &'a mut GroupMap,
    built_groups: &'a mut std::collections::HashSet<Key, ahash::RandomState>,
    rng: &'a mut dyn RngCore,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        values: &'a mut ValueMap,
        groups: &'a mut GroupMap,
        built_groups: &'a mut std::collections::HashSet<Key, ahash::RandomState>,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Engine {
            registry,
            values,
            groups,
            built_groups,
            rng,
        }
    }

    /// Resolve a single-valued key, building its provider if necessary.
    pub fn require<T: Send + Sync + 'static>(&mut self, key: &Key) -> Result<Arc<T>> {
        if let Some(existing) = self.values.get(key) {
            return downcast(existing.clone(), key);
        }

        let provider_id = self
            .registry
            .single_provider(key)
            .ok_or_else(|| DiError::MissingDeps { keys: vec![key.clone()] })?;

        self.call_provider(provider_id)?;

        let built = self
            .values
            .get(key)
            .cloned()
            .ok_or_else(|| DiError::MissingDeps { keys: vec![key.clone()] })?;
        downcast(built, key)
    }

    /// Resolve every contribution to a group, shuffling the read order.
    pub fn require_group<T: Send + Sync + 'static>(&mut self, key: &Key) -> Result<Vec<Arc<T>>> {
        if !self.built_groups.contains(key) {
            for provider_id in self.registry.group_providers(key) {
                self.call_provider(provider_id)?;
            }
            self.built_groups.insert(key.clone());
        }

        let mut values: Vec<Arc<T>> = self
            .groups
            .get(key)
            .into_iter()
            .flatten()
            .map(|value| downcast(value.clone(), key))
            .collect::<Result<Vec<_>>>()?;
        values.shuffle(self.rng);
        Ok(values)
    }

    fn call_provider(&mut self, provider_id: crate::registry::ProviderId) -> Result<()> {
        let provider = self.registry.provider(provider_id);
        if provider.called.get() {
            return Ok(());
        }

        // Belt-and-braces: registrations may have changed since this
        // provider's param tree was built, so re-check its own shallow
        // dependencies before running its constructor.
        self.registry
            .check_shallow_deps(&provider.param_tree)
            .map_err(|e| DiError::arguments_failed(provider.location, e))?;

        let mut staging = Staging::default();
        (provider.constructor)(self, &mut staging)?;
        provider.called.set(true);

        for (key, value) in staging.singles {
            self.values.insert(key, value);
        }
        for (key, value) in staging.groups {
            self.groups.entry(key).or_default().push(value);
        }
        Ok(())
    }
}

fn downcast<T: Send + Sync + 'static>(value: AnyArc, key: &Key) -> Result<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| DiError::bad_argument(format!("stored value for {key:?} has the wrong type")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;

    #[test]
    fn require_builds_and_memoizes_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        let build_count = Rc::new(Cell::new(0));
        let container = Container::new();
        let counter = build_count.clone();
        container
            .provide(move || {
                counter.set(counter.get() + 1);
                42u32
            })
            .unwrap();

        let first = container.invoke(|value: Arc<u32>| *value).unwrap();
        let second = container.invoke(|value: Arc<u32>| *value).unwrap();
        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(build_count.get(), 1);
    }
}
