//! Strong-reference store backed by hash maps.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::identity::{AnyIdentity, IdentityKey};
use crate::instance::Instance;
use crate::store::{AliasStore, Registration, Resolver, Store};

#[derive(Debug, Default)]
struct Maps {
    resolvers: HashMap<IdentityKey, Registration>,
    resolved: HashMap<IdentityKey, Instance>,
    aliases: HashMap<IdentityKey, IdentityKey>,
}

/// Keeps producers and cached values in plain maps.
///
/// Cached values live until they are removed or the store is dropped.
/// One lock covers all three maps, so every operation (alias
/// put-if-absent included) is atomic.
#[derive(Debug, Default)]
pub struct MapStore {
    maps: RwLock<Maps>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aliases_count(&self) -> usize {
        self.maps.read().aliases.len()
    }
}

impl Store for MapStore {
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
        self.maps.read().resolved.get(&identity.identity_key()).cloned()
    }

    fn has_resolved(&self, identity: &AnyIdentity) -> bool {
        self.maps.read().resolved.contains_key(&identity.identity_key())
    }

    fn put_resolved(&self, identity: &AnyIdentity, value: Instance) {
        trace!(identity = %identity, "Cached value");
        self.maps.write().resolved.insert(identity.identity_key(), value);
    }

    fn resolvers_count(&self) -> usize {
        self.maps.read().resolvers.len()
    }

    fn resolved_count(&self) -> usize {
        self.maps.read().resolved.len()
    }

    fn as_aliasing(&self) -> Option<&dyn AliasStore> {
        Some(self)
    }
}

impl AliasStore for MapStore {
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
        maps.resolved.get(reference).cloned()
    }

    fn put_aliased_resolved(&self, alias: &AnyIdentity, value: Instance) {
        let mut maps = self.maps.write();
        let Some(reference) = maps.aliases.get(&alias.identity_key()).cloned() else {
            return;
        };
        if !maps.resolved.contains_key(&reference) {
            trace!(alias = %alias, "Cached value under alias reference");
            maps.resolved.insert(reference, value);
        }
    }
}
