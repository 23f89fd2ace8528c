//! The compile-time stand-in for a runtime Reflector: traits that let the
//! registry walk a constructor's parameter and result shapes once, at
//! registration time, instead of reflecting on them on every call.
//!
//! [`Param`] is the parameter side (what a constructor demands) and
//! [`ResultSet`] is the result side (what a constructor produces). Neither
//! trait is ever implemented as a blanket `impl<T> ... for T` — every
//! implementation targets one concrete wrapper shape (`Arc<T>`,
//! `Option<Arc<T>>`, `Leaf<T>`, `Out<R>`, …) so that user-defined
//! `#[derive(Params)]`/`#[derive(Results)]` records never collide with a
//! built-in impl; see DESIGN.md's coherence note.

use std::sync::Arc;

use crate::error::Result;
use crate::key::Key;

// Re-exported so derive-macro-generated code can reach these through
// `injectgraph::reflect::{Engine, Staging}` alongside the traits below,
// without also needing to know about the `engine` module.
pub use crate::engine::{Engine, Staging};

/// Marker trait for types that may flow through the container.
///
/// Automatically implemented for every `Send + Sync + 'static` type. You
/// never implement this by hand.
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Describes the shape of a constructor's demands, for diagnostics and for
/// the graph-visualization inspection primitives.
#[derive(Clone, Debug)]
pub enum ParamNode {
    Leaf { key: Key, optional: bool },
    Record {
        type_name: &'static str,
        fields: Vec<(&'static str, ParamNode)>,
    },
}

impl ParamNode {
    /// Every leaf key this node (or its descendants) demands.
    pub fn leaves(&self) -> Vec<(&Key, bool)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<(&'a Key, bool)>) {
        match self {
            ParamNode::Leaf { key, optional } => out.push((key, *optional)),
            ParamNode::Record { fields, .. } => {
                for (_, field) in fields {
                    field.collect_leaves(out);
                }
            }
        }
    }
}

/// Describes the shape of a constructor's productions.
#[derive(Clone, Debug)]
pub enum ResultNode {
    Leaf { key: Key },
    Record {
        type_name: &'static str,
        fields: Vec<(&'static str, ResultNode)>,
    },
}

impl ResultNode {
    pub fn leaves(&self) -> Vec<&Key> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Key>) {
        match self {
            ResultNode::Leaf { key } => out.push(key),
            ResultNode::Record { fields, .. } => {
                for (_, field) in fields {
                    field.collect_leaves(out);
                }
            }
        }
    }
}

/// A single formal parameter of a constructor: either a leaf dependency or
/// a parameter-object record whose fields recurse.
pub trait Param: Sized {
    fn demand_tree() -> ParamNode;
    fn resolve(engine: &mut Engine<'_>) -> Result<Self>;
}

/// Marker implemented only by `#[derive(Params)]`-generated types.
/// Never implement this by hand; derive it instead.
pub trait ParamRecord: Param {}

impl<T: Injectable> Param for Arc<T> {
    fn demand_tree() -> ParamNode {
        ParamNode::Leaf {
            key: Key::unnamed::<T>(),
            optional: false,
        }
    }

    fn resolve(engine: &mut Engine<'_>) -> Result<Self> {
        engine.require::<T>(&Key::unnamed::<T>())
    }
}

impl<T: Injectable> Param for Option<Arc<T>> {
    fn demand_tree() -> ParamNode {
        ParamNode::Leaf {
            key: Key::unnamed::<T>(),
            optional: true,
        }
    }

    fn resolve(engine: &mut Engine<'_>) -> Result<Self> {
        Ok(engine.require::<T>(&Key::unnamed::<T>()).ok())
    }
}

impl Param for () {
    fn demand_tree() -> ParamNode {
        ParamNode::Record {
            type_name: "()",
            fields: Vec::new(),
        }
    }

    fn resolve(_engine: &mut Engine<'_>) -> Result<Self> {
        Ok(())
    }
}

// There is deliberately no `impl Param for Vec<Arc<T>>`: a group demand
// needs a group *name*, and `demand_tree()` is called with no instance to
// read a name from, so a bare `Vec<Arc<T>>` closure parameter could only
// ever name the empty group. A grouped dependency is instead demanded
// either through `#[derive(Params)]` (a `Vec<Arc<T>>` field tagged
// `#[di(group = "...")]`, where the name is a literal the macro bakes into
// the generated `demand_tree`/`resolve`) or directly via
// `Container::resolve_group`.

/// What a constructor's single return value produces: either one
/// unnamed/default-named leaf ([`Leaf`]) or a structured multi-field
/// production ([`Out`]). Both are internal wrapper types the `provide`/
/// `try_provide` machinery applies automatically — callers never write
/// them by hand except when returning a `#[derive(Results)]` record, which
/// must be wrapped in `Out(..)`.
pub trait ResultSet: Sized {
    fn production_tree(default_name: &str) -> ResultNode;
    fn commit(self, default_name: &str, staging: &mut Staging) -> Result<()>;
}

/// Wraps a constructor's plain return value as a single leaf production.
pub struct Leaf<T>(pub T);

impl<T: Injectable> ResultSet for Leaf<T> {
    fn production_tree(default_name: &str) -> ResultNode {
        ResultNode::Leaf {
            key: leaf_key::<T>(default_name),
        }
    }

    fn commit(self, default_name: &str, staging: &mut Staging) -> Result<()> {
        staging.push_single(leaf_key::<T>(default_name), Arc::new(self.0));
        Ok(())
    }
}

fn leaf_key<T: Injectable>(default_name: &str) -> Key {
    if default_name.is_empty() {
        Key::unnamed::<T>()
    } else {
        Key::named::<T>(default_name)
    }
}

/// Marker implemented only by `#[derive(Results)]`-generated types.
pub trait ResultRecord {
    fn production_fields() -> Vec<(&'static str, ResultNode)>;
    fn commit_fields(self, staging: &mut Staging) -> Result<()>;
    fn type_name() -> &'static str;
}

/// Wraps a `#[derive(Results)]` value so it can be returned from a
/// constructor without colliding with the bare single-leaf case.
pub struct Out<R>(pub R);

impl<R: ResultRecord> ResultSet for Out<R> {
    fn production_tree(_default_name: &str) -> ResultNode {
        ResultNode::Record {
            type_name: R::type_name(),
            fields: R::production_fields(),
        }
    }

    fn commit(self, _default_name: &str, staging: &mut Staging) -> Result<()> {
        self.0.commit_fields(staging)
    }
}

macro_rules! impl_param_tuple {
    ($($idx:tt $T:ident),+) => {
        impl<$($T: Param),+> Param for ($($T,)+) {
            fn demand_tree() -> ParamNode {
                ParamNode::Record {
                    type_name: stringify!(($($T,)+)),
                    fields: vec![$((stringify!($idx), $T::demand_tree())),+],
                }
            }

            fn resolve(engine: &mut Engine<'_>) -> Result<Self> {
                Ok(($($T::resolve(engine)?,)+))
            }
        }
    };
}

impl_param_tuple!(0 A);
impl_param_tuple!(0 A, 1 B);
impl_param_tuple!(0 A, 1 B, 2 C);
impl_param_tuple!(0 A, 1 B, 2 C, 3 D);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_param_demands_unnamed_leaf() {
        let tree = <Arc<u32> as Param>::demand_tree();
        match tree {
            ParamNode::Leaf { key, optional } => {
                assert_eq!(key, Key::unnamed::<u32>());
                assert!(!optional);
            }
            _ => panic!("expected leaf"),
        }
    }

    #[test]
    fn option_arc_param_is_optional() {
        let tree = <Option<Arc<u32>> as Param>::demand_tree();
        match tree {
            ParamNode::Leaf { optional, .. } => assert!(optional),
            _ => panic!("expected leaf"),
        }
    }

    #[test]
    fn unit_param_has_no_leaves() {
        assert!(<() as Param>::demand_tree().leaves().is_empty());
    }

    #[test]
    fn pair_param_demands_both_leaves() {
        let tree = <(Arc<u32>, Arc<u64>) as Param>::demand_tree();
        assert_eq!(tree.leaves().len(), 2);
    }
}
