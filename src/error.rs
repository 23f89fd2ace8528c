//! Error taxonomy for the container.
//!
//! Every fallible operation in this crate returns [`DiError`]. Each variant
//! carries enough provenance (a path into the record tree that produced
//! it, and where relevant the provider's registration site) for a caller
//! to locate the mistake without re-deriving it from a panic message.

use std::panic::Location;
use std::sync::Arc;
use thiserror::Error;

use crate::key::Key;

/// One step of a path into a parameter- or result-record tree, accumulated
/// while walking the tree so diagnostics can say exactly which field went
/// wrong.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Field(&'static str),
    Position(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Position(index) => write!(f, "[{index}]"),
        }
    }
}

pub(crate) fn format_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter().map(PathSegment::to_string).collect()
}

/// Errors produced while registering providers or invoking constructors.
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// A `provide`/`try_provide`/`invoke` call itself was malformed (wrong
    /// constructor shape, an empty extra-params list where one was
    /// required, and the like).
    #[error("bad argument: {reason}")]
    BadArgument { reason: String },

    /// Two leaves within the same param or result record resolved to the
    /// same key.
    #[error("duplicate key {key:?} within a single record at {}", format_path(path))]
    DuplicateWithinNode { key: Key, path: Vec<PathSegment> },

    /// A second provider was registered for a key that already has a
    /// single-valued (non-group) provider.
    #[error("key {key:?} is already provided by another constructor")]
    DuplicateAcrossProviders { key: Key },

    /// A provider's constructor produces no result leaves at all.
    #[error("constructor at {location} produces no results")]
    EmptyConstructor { location: &'static Location<'static> },

    /// Registering this provider would close a cycle in the dependency
    /// hypergraph.
    #[error("registering constructor at {location} would introduce a cycle: {cycle}")]
    Cycle {
        location: &'static Location<'static>,
        cycle: String,
    },

    /// One or more keys demanded by an invocation have no registered
    /// provider.
    #[error("missing dependencies: {}", .keys.iter().map(|k| format!("{k:?}")).collect::<Vec<_>>().join(", "))]
    MissingDeps { keys: Vec<Key> },

    /// A provider's constructor ran and returned an error.
    #[error("constructor at {location} for {key:?} failed: {source}")]
    ConstructorFailed {
        key: Key,
        location: &'static Location<'static>,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Building a provider's own parameter list failed before its
    /// constructor could even be called.
    #[error("could not build arguments for constructor at {location}: {source}")]
    ArgumentsFailed {
        location: &'static Location<'static>,
        #[source]
        source: Box<DiError>,
    },
}

impl DiError {
    #[inline]
    pub fn bad_argument(reason: impl Into<String>) -> Self {
        DiError::BadArgument {
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn constructor_failed<E>(key: Key, location: &'static Location<'static>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DiError::ConstructorFailed {
            key,
            location,
            source: Arc::new(source),
        }
    }

    #[inline]
    pub fn arguments_failed(location: &'static Location<'static>, source: DiError) -> Self {
        DiError::ArgumentsFailed {
            location,
            source: Box::new(source),
        }
    }
}

/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_deps_message_lists_every_key() {
        let err = DiError::MissingDeps {
            keys: vec![Key::unnamed::<u32>(), Key::named::<u64>("x")],
        };
        let message = err.to_string();
        assert!(message.contains("u32"));
        assert!(message.contains("u64"));
    }

    #[test]
    fn format_path_of_empty_path_is_root() {
        assert_eq!(format_path(&[]), "<root>");
    }

    #[test]
    fn format_path_joins_segments() {
        let path = vec![PathSegment::Field("db"), PathSegment::Position(0)];
        assert_eq!(format_path(&path), ".db[0]");
    }
}
