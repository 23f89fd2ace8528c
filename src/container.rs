//! The container facade: the public surface that ties the registry, the
//! acyclic verifier, and the instantiation engine together.
//!
//! A small `Clone`-able handle over shared interior state, with chainable
//! registration methods. Deliberately `!Send + !Sync`: this is a
//! single-threaded, non-reentrant container with no concurrent `invoke`,
//! so a plain `Rc<RefCell<Inner>>` is enough — no lock-free map or
//! thread-local hot cache required.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::panic::Location;
use std::rc::Rc;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::engine::Engine;
use crate::error::{DiError, Result};
use crate::key::Key;
use crate::reflect::{Injectable, Leaf, Out, Param, ParamNode, ResultNode, ResultRecord, ResultSet};
use crate::registry::{ProviderId, Registry};

type AnyArc = Arc<dyn Any + Send + Sync>;

struct Inner {
    registry: Registry,
    values: std::collections::HashMap<Key, AnyArc, ahash::RandomState>,
    groups: std::collections::HashMap<Key, Vec<AnyArc>, ahash::RandomState>,
    built_groups: HashSet<Key, ahash::RandomState>,
    rng: Box<dyn RngCore>,
    verified_acyclic: Cell<bool>,
    defer_acyclic_verification: bool,
}

/// A dependency-injection container: a provider registry plus the values
/// it has built so far.
///
/// Cloning a `Container` is cheap and shares the same underlying state,
/// but it is confined to a single thread: there is no concurrent
/// `invoke`, so `Container` is deliberately `!Send + !Sync`.
#[derive(Clone)]
pub struct Container {
    inner: Rc<RefCell<Inner>>,
}

impl Container {
    /// Create an empty container with eager acyclic verification (the
    /// default: every `provide`/`try_provide` call is checked for cycles
    /// immediately).
    pub fn new() -> Self {
        Container {
            inner: Rc::new(RefCell::new(Inner {
                registry: Registry::new(),
                values: Default::default(),
                groups: Default::default(),
                built_groups: Default::default(),
                rng: Box::new(SmallRng::from_rng(&mut rand::rng())),
                verified_acyclic: Cell::new(true),
                defer_acyclic_verification: false,
            })),
        }
    }

    /// Build a container that defers the full acyclic check to the first
    /// `invoke` instead of checking eagerly on every `provide`.
    pub fn with_deferred_acyclic_verification() -> Self {
        let container = Container::new();
        container.inner.borrow_mut().defer_acyclic_verification = true;
        container
    }

    /// Override the RNG used to shuffle grouped reads. Intended for tests
    /// that need deterministic group ordering.
    pub fn set_rand(&self, rng: impl RngCore + 'static) {
        self.inner.borrow_mut().rng = Box::new(rng);
    }

    /// Register a constructor producing a single, unnamed value.
    #[track_caller]
    pub fn provide<F, Marker, T>(&self, ctor: F) -> Result<()>
    where
        F: IntoConstructor<Marker, T> + 'static,
        T: Injectable,
        Marker: 'static,
    {
        self.provide_named("", ctor)
    }

    /// Register a constructor producing a single, named value. An empty
    /// name is the unnamed, default case.
    #[track_caller]
    pub fn provide_named<F, Marker, T>(&self, name: &str, ctor: F) -> Result<()>
    where
        F: IntoConstructor<Marker, T> + 'static,
        T: Injectable,
        Marker: 'static,
    {
        let location = Location::caller();
        let param_tree = F::param_tree();
        let result_tree = <Leaf<T> as ResultSet>::production_tree(name);
        let name = name.to_string();
        let boxed: crate::registry::Constructor = Box::new(move |engine, staging| {
            let value = ctor
                .call(engine)
                .map_err(|e| DiError::arguments_failed(location, e))?;
            Leaf(value).commit(&name, staging)
        });
        self.register(location, param_tree, result_tree, boxed).map(|_| ())
    }

    /// Register a constructor whose output is a `#[derive(Results)]`
    /// record wrapped in [`Out`], contributing multiple named/grouped
    /// leaves from a single call.
    #[track_caller]
    pub fn provide_out<F, Marker, R>(&self, ctor: F) -> Result<()>
    where
        F: IntoConstructor<Marker, Out<R>> + 'static,
        R: ResultRecord,
        Marker: 'static,
    {
        let location = Location::caller();
        let param_tree = F::param_tree();
        let result_tree = <Out<R> as ResultSet>::production_tree("");
        let boxed: crate::registry::Constructor = Box::new(move |engine, staging| {
            let value = ctor
                .call(engine)
                .map_err(|e| DiError::arguments_failed(location, e))?;
            value.commit("", staging)
        });
        self.register(location, param_tree, result_tree, boxed).map(|_| ())
    }

    /// Register a constructor contributing one value to a named group.
    #[track_caller]
    pub fn provide_group<T, F, Marker>(&self, group: &str, ctor: F) -> Result<()>
    where
        F: IntoConstructor<Marker, T> + 'static,
        T: Injectable,
        Marker: 'static,
    {
        let location = Location::caller();
        let param_tree = F::param_tree();
        let key = Key::group::<T>(group);
        let result_tree = ResultNode::Leaf { key: key.clone() };
        let boxed: crate::registry::Constructor = Box::new(move |engine, staging| {
            let value = ctor
                .call(engine)
                .map_err(|e| DiError::arguments_failed(location, e))?;
            staging.push_group(key.clone(), Arc::new(value));
            Ok(())
        });
        self.register(location, param_tree, result_tree, boxed).map(|_| ())
    }

    /// Register a fallible constructor producing a single, unnamed value.
    #[track_caller]
    pub fn try_provide<F, Marker, T, E>(&self, ctor: F) -> Result<()>
    where
        F: IntoConstructor<Marker, std::result::Result<T, E>> + 'static,
        T: Injectable,
        E: std::error::Error + Send + Sync + 'static,
        Marker: 'static,
    {
        let location = Location::caller();
        let param_tree = F::param_tree();
        let result_tree = <Leaf<T> as ResultSet>::production_tree("");
        let key = Key::unnamed::<T>();
        let boxed: crate::registry::Constructor = Box::new(move |engine, staging| {
            let value = ctor
                .call(engine)
                .map_err(|e| DiError::arguments_failed(location, e))?
                .map_err(|e| DiError::constructor_failed(key.clone(), location, e))?;
            Leaf(value).commit("", staging)
        });
        self.register(location, param_tree, result_tree, boxed).map(|_| ())
    }

    fn register(
        &self,
        location: &'static Location<'static>,
        param_tree: ParamNode,
        result_tree: ResultNode,
        constructor: crate::registry::Constructor,
    ) -> Result<ProviderId> {
        #[cfg(feature = "logging")]
        tracing::debug!(target: "injectgraph", ?location, "provide");
        let mut inner = self.inner.borrow_mut();
        let defer = inner.defer_acyclic_verification;
        let id = inner
            .registry
            .register(location, param_tree, result_tree, constructor, defer)?;
        inner.verified_acyclic.set(false);
        Ok(id)
    }

    /// Call `f`, resolving its parameters from the container, and return
    /// its result.
    #[track_caller]
    pub fn invoke<F, Marker, T>(&self, f: F) -> Result<T>
    where
        F: IntoConstructor<Marker, T> + 'static,
        Marker: 'static,
    {
        self.inner.borrow().registry.check_shallow_deps(&F::param_tree())?;
        self.ensure_acyclic()?;
        #[cfg(feature = "logging")]
        tracing::trace!(target: "injectgraph", "invoke");
        let mut inner = self.inner.borrow_mut();
        let Inner {
            registry,
            values,
            groups,
            built_groups,
            rng,
            ..
        } = &mut *inner;
        let mut engine = Engine::new(registry, values, groups, built_groups, rng.as_mut());
        f.call(&mut engine)
    }

    /// Resolve a single unnamed value directly, without calling through a
    /// user function. A thin convenience wrapper over `invoke`.
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>> {
        self.invoke(|value: Arc<T>| value)
    }

    /// Resolve a single named value directly.
    pub fn resolve_named<T: Injectable>(&self, name: &str) -> Result<Arc<T>> {
        self.ensure_acyclic()?;
        let mut inner = self.inner.borrow_mut();
        let Inner {
            registry,
            values,
            groups,
            built_groups,
            rng,
            ..
        } = &mut *inner;
        let mut engine = Engine::new(registry, values, groups, built_groups, rng.as_mut());
        engine.require::<T>(&Key::named::<T>(name))
    }

    /// Resolve every contribution to a named group directly, shuffled.
    pub fn resolve_group<T: Injectable>(&self, group: &str) -> Result<Vec<Arc<T>>> {
        self.ensure_acyclic()?;
        let mut inner = self.inner.borrow_mut();
        let Inner {
            registry,
            values,
            groups,
            built_groups,
            rng,
            ..
        } = &mut *inner;
        let mut engine = Engine::new(registry, values, groups, built_groups, rng.as_mut());
        engine.require_group::<T>(&Key::group::<T>(group))
    }

    fn ensure_acyclic(&self) -> Result<()> {
        let inner = self.inner.borrow();
        if inner.verified_acyclic.get() {
            return Ok(());
        }
        match inner.registry.verify_all_acyclic() {
            Ok(()) => {
                inner.verified_acyclic.set(true);
                Ok(())
            }
            Err(cycle) => Err(DiError::Cycle {
                location: Location::caller(),
                cycle: cycle.describe(&inner.registry),
            }),
        }
    }

    /// Every known type name currently registered, deduplicated and
    /// sorted — a read-only inspection primitive for graph-visualization
    /// tooling.
    pub fn known_types(&self) -> Vec<&'static str> {
        let inner = self.inner.borrow();
        let mut names: Vec<&'static str> = inner.registry.known_keys().map(|k| k.type_name).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn provider_count(&self) -> usize {
        self.inner.borrow().registry.nodes().len()
    }
}

impl Default for Container {
    fn default() -> Self {
        Container::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Container")
            .field("providers", &inner.registry.nodes().len())
            .field("values", &inner.values.len())
            .field("groups", &inner.groups.len())
            .finish()
    }
}

/// Adapts a plain Rust function/closure of arity 0..=3 into something the
/// container can call with its parameters resolved from the registry.
///
/// `Marker` is the tuple of parameter types, used purely to distinguish
/// the per-arity impls below from one another (the same trick `axum`'s
/// `Handler` uses) — it is never constructed.
pub trait IntoConstructor<Marker, Output> {
    fn param_tree() -> ParamNode;
    fn call(&self, engine: &mut Engine<'_>) -> Result<Output>;
}

impl<F, Output> IntoConstructor<(), Output> for F
where
    F: Fn() -> Output,
{
    fn param_tree() -> ParamNode {
        <() as Param>::demand_tree()
    }

    fn call(&self, engine: &mut Engine<'_>) -> Result<Output> {
        let () = <() as Param>::resolve(engine)?;
        Ok(self())
    }
}

macro_rules! impl_into_constructor {
    ($($idx:tt $T:ident),+) => {
        impl<F, $($T: Param),+, Output> IntoConstructor<($($T,)+), Output> for F
        where
            F: Fn($($T),+) -> Output,
        {
            fn param_tree() -> ParamNode {
                <($($T,)+) as Param>::demand_tree()
            }

            fn call(&self, engine: &mut Engine<'_>) -> Result<Output> {
                let ($($T,)+) = <($($T,)+) as Param>::resolve(engine)?;
                Ok(self($($T),+))
            }
        }
    };
}

impl_into_constructor!(0 A);
impl_into_constructor!(0 A, 1 B);
impl_into_constructor!(0 A, 1 B, 2 C);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    struct Config {
        value: u32,
    }

    struct Database {
        url: String,
    }

    #[test]
    fn singleton_is_built_once_and_shared() {
        let container = Container::new();
        container.provide(|| Config { value: 7 }).unwrap();
        container
            .provide(|cfg: Arc<Config>| Database {
                url: format!("db://{}", cfg.value),
            })
            .unwrap();
        let url = container.invoke(|db: Arc<Database>| db.url.clone()).unwrap();
        assert_eq!(url, "db://7");
    }

    #[test]
    fn named_values_are_disambiguated() {
        let container = Container::new();
        container.provide_named("primary", || Config { value: 1 }).unwrap();
        container.provide_named("replica", || Config { value: 2 }).unwrap();
        let primary = container.resolve_named::<Config>("primary").unwrap();
        let replica = container.resolve_named::<Config>("replica").unwrap();
        assert_eq!(primary.value, 1);
        assert_eq!(replica.value, 2);
    }

    #[test]
    fn optional_missing_dependency_resolves_to_none() {
        let container = Container::new();
        let present = container
            .invoke(|logger: Option<Arc<Config>>| logger.is_some())
            .unwrap();
        assert!(!present);
    }

    #[test]
    fn cycle_on_provide_is_rejected() {
        struct A;
        struct B;
        let container = Container::new();
        container.provide(|_b: Arc<B>| A).unwrap();
        let err = container.provide(|_a: Arc<A>| B).unwrap_err();
        assert!(matches!(err, DiError::Cycle { .. }));
    }

    #[test]
    fn failed_construction_does_not_poison_the_container() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom")]
        struct Boom;

        let attempt = Rc::new(Cell::new(0u32));
        let counter = attempt.clone();
        let container = Container::new();
        container
            .try_provide(move || -> std::result::Result<Config, Boom> {
                let n = counter.get();
                counter.set(n + 1);
                if n == 0 {
                    Err(Boom)
                } else {
                    Ok(Config { value: 99 })
                }
            })
            .unwrap();

        let first = container.invoke(|cfg: Arc<Config>| cfg.value);
        assert!(first.is_err());
        let second = container.invoke(|cfg: Arc<Config>| cfg.value).unwrap();
        assert_eq!(second, 99);
    }

    #[test]
    fn group_reads_are_shuffled_by_the_container_rng() {
        let container = Container::new();
        container.set_rand(StepRng::new(0, 1));
        container.provide_group::<u32, _, _>("g", || 1u32).unwrap();
        container.provide_group::<u32, _, _>("g", || 2u32).unwrap();
        container.provide_group::<u32, _, _>("g", || 3u32).unwrap();
        let mut values = container.resolve_group::<u32>("g").unwrap();
        values.sort_by_key(|v| **v);
        assert_eq!(values.iter().map(|v| **v).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn argument_build_failure_is_wrapped_with_the_provider_location() {
        struct Needs(#[allow(dead_code)] Arc<Config>);
        let container = Container::new();
        container.provide(|cfg: Arc<Config>| Needs(cfg)).unwrap();
        let err = container.invoke(|needs: Arc<Needs>| needs.0.value).unwrap_err();
        match err {
            DiError::ArgumentsFailed { source, .. } => {
                assert!(matches!(*source, DiError::MissingDeps { .. }));
            }
            other => panic!("expected ArgumentsFailed, got {other:?}"),
        }
    }

    #[test]
    fn missing_deps_are_aggregated_into_one_error() {
        struct Other;
        let container = Container::new();
        let err = container
            .invoke(|_cfg: Arc<Config>, _other: Arc<Other>| ())
            .unwrap_err();
        match err {
            DiError::MissingDeps { keys } => assert_eq!(keys.len(), 2),
            other => panic!("expected MissingDeps, got {other:?}"),
        }
    }

    #[test]
    fn deferred_acyclic_verification_is_checked_once_before_invoke() {
        let container = Container::with_deferred_acyclic_verification();
        container.provide(|| Config { value: 1 }).unwrap();
        assert_eq!(container.invoke(|cfg: Arc<Config>| cfg.value).unwrap(), 1);
    }
}
