//! # injectgraph - reflective dependency injection with acyclic verification
//!
//! A type-keyed, constructor-based dependency-injection container: register
//! constructors, and the container works out a build order, memoizes each
//! constructor's result, and verifies up front that no provider demands
//! (directly or transitively) something it produces.
//!
//! ## Quick start
//!
//! ```rust
//! use injectgraph::Container;
//! use std::sync::Arc;
//!
//! struct Config { url: String }
//! struct Database { url: String }
//!
//! let container = Container::new();
//! container.provide(|| Config { url: "postgres://localhost".into() }).unwrap();
//! container.provide(|cfg: Arc<Config>| Database { url: cfg.url.clone() }).unwrap();
//!
//! let db = container.invoke(|db: Arc<Database>| db.url.clone()).unwrap();
//! assert_eq!(db, "postgres://localhost");
//! ```
//!
//! ## Named values
//!
//! A type can have more than one provider as long as each is given a
//! distinct name:
//!
//! ```rust
//! use injectgraph::Container;
//!
//! let container = Container::new();
//! container.provide_named("primary", || 1u32).unwrap();
//! container.provide_named("replica", || 2u32).unwrap();
//! assert_eq!(*container.resolve_named::<u32>("primary").unwrap(), 1);
//! ```
//!
//! ## Value groups
//!
//! Multiple providers can contribute to the same named group; readers get
//! every contribution as a shuffled `Vec`, so application code can't come to
//! depend on registration order:
//!
//! ```rust
//! use injectgraph::Container;
//!
//! let container = Container::new();
//! container.provide_group::<u32, _, _>("handlers", || 1u32).unwrap();
//! container.provide_group::<u32, _, _>("handlers", || 2u32).unwrap();
//! let handlers = container.resolve_group::<u32>("handlers").unwrap();
//! assert_eq!(handlers.len(), 2);
//! ```
//!
//! ## Cycle rejection
//!
//! By default, `provide` checks for cycles eagerly: a registration that
//! would close a cycle is rejected immediately and rolled back, leaving the
//! container exactly as it was before the call.
//!
//! ```rust
//! use injectgraph::{Container, DiError};
//! use std::sync::Arc;
//!
//! struct A;
//! struct B;
//!
//! let container = Container::new();
//! container.provide(|_b: Arc<B>| A).unwrap();
//! let err = container.provide(|_a: Arc<A>| B).unwrap_err();
//! assert!(matches!(err, DiError::Cycle { .. }));
//! ```

pub mod container;
pub mod engine;
pub mod error;
pub mod key;
#[cfg(feature = "logging")]
pub mod logging;
pub mod reflect;
pub mod registry;
pub mod verify;

pub use container::{Container, IntoConstructor};
pub use error::{DiError, PathSegment, Result};
pub use key::Key;
pub use reflect::{Injectable, Leaf, Out, Param, ParamNode, ParamRecord, ResultNode, ResultRecord, ResultSet};
pub use registry::ProviderId;

// Re-export tracing macros for convenience when the logging feature is enabled.
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

pub use std::sync::Arc;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Container, DiError, Injectable, Key, Leaf, Out, Param, Result};
    pub use std::sync::Arc;
}
