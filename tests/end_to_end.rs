//! Black-box integration tests exercising the container purely through its
//! public API, one scenario per test.

use injectgraph::{Container, DiError};
use std::sync::Arc;

struct Config {
    env: String,
}

struct Database {
    url: String,
}

#[test]
fn singleton_is_built_once_across_multiple_invokes() {
    let container = Container::new();
    container
        .provide(|| Config {
            env: "production".into(),
        })
        .unwrap();
    container
        .provide(|cfg: Arc<Config>| Database {
            url: format!("postgres://{}", cfg.env),
        })
        .unwrap();

    let first = container.resolve::<Database>().unwrap();
    let second = container.resolve::<Database>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.url, "postgres://production");
}

#[test]
fn named_providers_disambiguate_the_same_type() {
    let container = Container::new();
    container
        .provide_named("primary", || Database {
            url: "postgres://primary".into(),
        })
        .unwrap();
    container
        .provide_named("replica", || Database {
            url: "postgres://replica".into(),
        })
        .unwrap();

    let primary = container.resolve_named::<Database>("primary").unwrap();
    let replica = container.resolve_named::<Database>("replica").unwrap();
    assert_eq!(primary.url, "postgres://primary");
    assert_eq!(replica.url, "postgres://replica");
}

#[test]
fn grouped_contributions_accumulate_from_every_provider() {
    struct Handler(&'static str);

    let container = Container::new();
    container.provide_group::<Handler, _, _>("handlers", || Handler("auth")).unwrap();
    container.provide_group::<Handler, _, _>("handlers", || Handler("metrics")).unwrap();
    container.provide_group::<Handler, _, _>("handlers", || Handler("logging")).unwrap();

    let mut names: Vec<&str> = container
        .resolve_group::<Handler>("handlers")
        .unwrap()
        .iter()
        .map(|h| h.0)
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["auth", "logging", "metrics"]);
}

#[test]
fn optional_dependency_with_no_provider_resolves_to_none() {
    let container = Container::new();
    container
        .provide(|| Config {
            env: "dev".into(),
        })
        .unwrap();

    let has_database = container
        .invoke(|_cfg: Arc<Config>, db: Option<Arc<Database>>| db.is_some())
        .unwrap();
    assert!(!has_database);
}

#[test]
fn cycle_on_provide_is_rejected_and_the_registry_is_rolled_back() {
    struct A;
    struct B;

    let container = Container::new();
    container.provide(|_b: Arc<B>| A).unwrap();
    let err = container.provide(|_a: Arc<A>| B).unwrap_err();
    assert!(matches!(err, DiError::Cycle { .. }));

    // The rejected registration must not have left B half-registered.
    container.provide(|| B).unwrap();
    assert!(container.resolve::<B>().is_ok());
}

#[test]
fn a_failed_constructor_does_not_poison_the_container_and_retry_succeeds() {
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct ConnectFailed;

    let attempts = Rc::new(Cell::new(0u32));
    let counter = attempts.clone();

    let container = Container::new();
    container
        .try_provide(move || -> Result<Database, ConnectFailed> {
            let n = counter.get();
            counter.set(n + 1);
            if n == 0 {
                Err(ConnectFailed)
            } else {
                Ok(Database {
                    url: "postgres://retry".into(),
                })
            }
        })
        .unwrap();

    let first_attempt = container.resolve::<Database>();
    assert!(first_attempt.is_err());

    let second_attempt = container.resolve::<Database>().unwrap();
    assert_eq!(second_attempt.url, "postgres://retry");
    assert_eq!(attempts.get(), 2);
}

#[test]
fn missing_dependency_reports_the_key_that_is_missing() {
    let container = Container::new();
    let err = container.resolve::<Database>().unwrap_err();
    match err {
        DiError::MissingDeps { keys } => {
            assert_eq!(keys.len(), 1);
            assert!(format!("{:?}", keys[0]).contains("Database"));
        }
        other => panic!("expected MissingDeps, got {other:?}"),
    }
}

#[test]
fn deferred_verification_lets_dependents_be_registered_before_their_dependencies() {
    struct Leaf;
    struct Root(#[allow(dead_code)] Arc<Leaf>);

    let container = Container::with_deferred_acyclic_verification();
    // Root depends on Leaf, but Leaf isn't registered yet — eager
    // verification would have nothing to walk here either way, but this
    // also works the other way around with deferred verification.
    container.provide(|leaf: Arc<Leaf>| Root(leaf)).unwrap();
    container.provide(|| Leaf).unwrap();

    assert!(container.resolve::<Root>().is_ok());
}
