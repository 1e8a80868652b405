//! Weak-reference store.
//!
//! Producers are always held strongly. Cached values are held through
//! [`WeakInstance`]s, so a singleton nobody else holds is dropped and the
//! next resolve produces it again. A value that disappears between
//! `has_resolved` and `get_resolved` simply reads as "not yet resolved".

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::identity::{AnyIdentity, IdentityKey};
use crate::instance::{Instance, WeakInstance};
use crate::store::{AliasStore, Registration, Resolver, Store};

#[derive(Debug)]
enum Slot {
    Strong(Instance),
    Weak(WeakInstance),
}

impl Slot {
    fn get(&self) -> Option<Instance> {
        match self {
            Slot::Strong(instance) => Some(instance.clone()),
            Slot::Weak(weak) => weak.upgrade(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Slot::Strong(_) => true,
            Slot::Weak(weak) => weak.is_alive(),
        }
    }
}

#[derive(Debug, Default)]
struct Maps {
    resolvers: HashMap<IdentityKey, Registration>,
    resolved: HashMap<IdentityKey, Slot>,
    aliases: HashMap<IdentityKey, IdentityKey>,
}

impl Maps {
    fn prune(&mut self) {
        self.resolved.retain(|_, slot| slot.is_alive());
    }
}

/// A store whose cached values do not keep themselves alive.
///
/// Set `strong_references` to hold cached values strongly instead,
/// which makes this store behave like [`MapStore`](crate::map_store::MapStore).
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use mawrid_container::identity::Identity;
/// use mawrid_container::instance::Instance;
/// use mawrid_container::store::Store;
/// use mawrid_container::weak_store::WeakStore;
///
/// let store = WeakStore::new();
/// let id = Identity::<String>::of();
///
/// let held = Arc::new(String::from("session"));
/// store.put_resolved(id.erased(), Instance::new(held.clone()));
/// assert!(store.has_resolved(id.erased()));
///
/// drop(held);
/// assert!(!store.has_resolved(id.erased()));
/// ```
#[derive(Debug, Default)]
pub struct WeakStore {
    strong_references: bool,
    maps: RwLock<Maps>,
}

impl WeakStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strong_references(strong_references: bool) -> Self {
        Self {
            strong_references,
            maps: RwLock::default(),
        }
    }

    pub fn strong_references(&self) -> bool {
        self.strong_references
    }

    fn slot_for(&self, value: Instance) -> Slot {
        if self.strong_references {
            Slot::Strong(value)
        } else {
            Slot::Weak(value.downgrade())
        }
    }
}

impl Store for WeakStore {
    fn put_resolver(&self, identity: &AnyIdentity, resolver: Resolver) {
        debug!(identity = %identity, lifecycle = %identity.lifecycle(), "Registered resolver");
        self.maps.write().resolvers.insert(
            identity.identity_key(),
            Registration::new(identity.clone(), resolver),
        );
    }

    fn get_resolver(&self, identity: &AnyIdentity) -> Option<Registration> {
        self.maps.read().resolvers.get(&identity.identity_key()).cloned()
    }

    fn remove(&self, identity: &AnyIdentity) {
        let key = identity.identity_key();
        let mut maps = self.maps.write();
        maps.resolvers.remove(&key);
        maps.resolved.remove(&key);
        debug!(identity = %identity, "Removed");
    }

    fn remove_all(&self) {
        let mut maps = self.maps.write();
        maps.resolvers.clear();
        maps.resolved.clear();
        maps.aliases.clear();
        debug!("Removed all registrations");
    }

    fn get_resolved(&self, identity: &AnyIdentity) -> Option<Instance> {
        self.maps
            .read()
            .resolved
            .get(&identity.identity_key())
            .and_then(Slot::get)
    }

    fn has_resolved(&self, identity: &AnyIdentity) -> bool {
        self.maps
            .read()
            .resolved
            .get(&identity.identity_key())
            .is_some_and(Slot::is_alive)
    }

    fn put_resolved(&self, identity: &AnyIdentity, value: Instance) {
        trace!(identity = %identity, strong = self.strong_references, "Cached value");
        let slot = self.slot_for(value);
        let mut maps = self.maps.write();
        maps.prune();
        maps.resolved.insert(identity.identity_key(), slot);
    }

    fn resolvers_count(&self) -> usize {
        self.maps.read().resolvers.len()
    }

    /// Counts live values only.
    fn resolved_count(&self) -> usize {
        self.maps
            .read()
            .resolved
            .values()
            .filter(|slot| slot.is_alive())
            .count()
    }

    fn as_aliasing(&self) -> Option<&dyn AliasStore> {
        Some(self)
    }
}

impl AliasStore for WeakStore {
    fn register_alias(&self, alias: &AnyIdentity, reference: &AnyIdentity) {
        debug!(alias = %alias, reference = %reference, "Registered alias");
        self.maps
            .write()
            .aliases
            .insert(alias.identity_key(), reference.identity_key());
    }

    fn get_aliased_resolver(&self, alias: &AnyIdentity) -> Option<Registration> {
        let maps = self.maps.read();
        let reference = maps.aliases.get(&alias.identity_key())?;
        maps.resolvers.get(reference).cloned()
    }

    fn get_aliased_resolved(&self, alias: &AnyIdentity) -> Option<Instance> {
        let maps = self.maps.read();
        let reference = maps.aliases.get(&alias.identity_key())?;
        maps.resolved.get(reference).and_then(Slot::get)
    }

    fn put_aliased_resolved(&self, alias: &AnyIdentity, value: Instance) {
        let slot = self.slot_for(value);
        let mut maps = self.maps.write();
        let Some(reference) = maps.aliases.get(&alias.identity_key()).cloned() else {
            return;
        };
        maps.prune();
        if !maps.resolved.contains_key(&reference) {
            trace!(alias = %alias, "Cached value under alias reference");
            maps.resolved.insert(reference, slot);
        }
    }
}
