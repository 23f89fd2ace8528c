//! Type-keyed identity for values flowing through the container.
//!
//! A [`Key`] is what the provider registry, the value store, and the
//! acyclic verifier all index by. It pairs a [`TypeId`] with a
//! [`Discriminator`] that says whether the key names a single unnamed
//! value, a named value, or a contribution to a named group. The
//! discriminator is an enum rather than two `Option<String>` fields so
//! that "named and grouped at once" is unrepresentable, not merely
//! forbidden at runtime.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone, Debug, Eq)]
pub enum Discriminator {
    Unnamed,
    Named(Box<str>),
    Group(Box<str>),
}

impl PartialEq for Discriminator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Discriminator::Unnamed, Discriminator::Unnamed) => true,
            (Discriminator::Named(a), Discriminator::Named(b)) => a == b,
            (Discriminator::Group(a), Discriminator::Group(b)) => a == b,
            _ => false,
        }
    }
}

impl Hash for Discriminator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Discriminator::Unnamed => 0u8.hash(state),
            Discriminator::Named(name) => {
                1u8.hash(state);
                name.hash(state);
            }
            Discriminator::Group(group) => {
                2u8.hash(state);
                group.hash(state);
            }
        }
    }
}

/// Identifies a single slot in the container: a type, optionally
/// disambiguated by a name or aggregated into a named group.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Key {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub discriminator: Discriminator,
}

impl Key {
    #[inline]
    pub fn unnamed<T: 'static>() -> Self {
        Key {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            discriminator: Discriminator::Unnamed,
        }
    }

    #[inline]
    pub fn named<T: 'static>(name: impl Into<Box<str>>) -> Self {
        Key {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            discriminator: Discriminator::Named(name.into()),
        }
    }

    #[inline]
    pub fn group<T: 'static>(group: impl Into<Box<str>>) -> Self {
        Key {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            discriminator: Discriminator::Group(group.into()),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.discriminator, Discriminator::Group(_))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discriminator {
            Discriminator::Unnamed => write!(f, "{}", self.type_name),
            Discriminator::Named(name) => write!(f, "{} (name = {:?})", self.type_name, name),
            Discriminator::Group(group) => write!(f, "{} (group = {:?})", self.type_name, group),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
