//! Registry storage.
//!
//! A [`Store`] maps identities to producers and, independently, to
//! cached values. [`AliasStore`] layers alias edges on top. Two
//! strategies ship with the crate:
//! - [`MapStore`](crate::map_store::MapStore): values live as long as the store
//! - [`WeakStore`](crate::weak_store::WeakStore): values live as long as someone
//!   outside the store holds them
//!
//! Every operation is total: lookups return `None`, writes never fail.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::identity::AnyIdentity;
use crate::instance::Instance;
use crate::resolvable::Resolvable;

/// A producer.
///
/// Receives the engine as a [`Resolvable`] so it can resolve its own
/// dependencies. Lookups clone the `Arc` out of the store, so the
/// producer runs with the store lock released.
pub type Resolver = Arc<dyn Fn(&dyn Resolvable) -> Result<Instance> + Send + Sync>;

/// A producer together with the identity it was registered under.
///
/// The identity keeps the registration's lifecycle and auto-create
/// target; the last registration for a `(type, key)` wins.
#[derive(Clone)]
pub struct Registration {
    identity: AnyIdentity,
    resolver: Resolver,
}

impl Registration {
    pub fn new(identity: AnyIdentity, resolver: Resolver) -> Self {
        Self { identity, resolver }
    }

    #[inline]
    pub fn identity(&self) -> &AnyIdentity {
        &self.identity
    }

    #[inline]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Runs the producer.
    pub fn invoke(&self, resolver: &dyn Resolvable) -> Result<Instance> {
        (self.resolver)(resolver)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Persists producers and produced values.
pub trait Store: Send + Sync + fmt::Debug {
    /// Saves a producer for `identity`, replacing any previous one.
    fn put_resolver(&self, identity: &AnyIdentity, resolver: Resolver);

    /// The producer registered for `identity`.
    fn get_resolver(&self, identity: &AnyIdentity) -> Option<Registration>;

    /// Drops the producer and cached value of `identity`.
    fn remove(&self, identity: &AnyIdentity);

    /// Drops every producer, cached value and alias.
    fn remove_all(&self);

    /// The cached value of `identity`.
    fn get_resolved(&self, identity: &AnyIdentity) -> Option<Instance>;

    fn has_resolved(&self, identity: &AnyIdentity) -> bool {
        self.get_resolved(identity).is_some()
    }

    /// Caches a value for `identity`, replacing any previous one.
    fn put_resolved(&self, identity: &AnyIdentity, value: Instance);

    fn resolvers_count(&self) -> usize;

    fn resolved_count(&self) -> usize;

    /// The alias extension of this store, when supported.
    fn as_aliasing(&self) -> Option<&dyn AliasStore> {
        None
    }
}

/// A [`Store`] that supports aliases.
///
/// An alias forwards to a reference identity. Lookups through the alias
/// read the reference's slots; writes through the alias only fill the
/// reference's cached value when it is empty.
pub trait AliasStore: Store {
    /// Makes `alias` forward to `reference`.
    fn register_alias(&self, alias: &AnyIdentity, reference: &AnyIdentity);

    /// The producer of the identity `alias` points to.
    fn get_aliased_resolver(&self, alias: &AnyIdentity) -> Option<Registration>;

    /// The cached value of the identity `alias` points to.
    fn get_aliased_resolved(&self, alias: &AnyIdentity) -> Option<Instance>;

    /// Caches `value` under the identity `alias` points to, first writer wins.
    fn put_aliased_resolved(&self, alias: &AnyIdentity, value: Instance);
}
