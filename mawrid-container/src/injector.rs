//! # The Injector
//!
//! Resolves identities to shared values and manages their lifecycle.
//!
//! # Resolution order
//! ```text
//! resolve(identity)
//!   │
//!   ├─ cached value for identity ─────────────────────────► return
//!   ├─ cached value of the alias reference ───────────────► return
//!   │
//!   ├─ producer: direct ─► through alias ─► constructor table
//!   │                                         (registered for reuse)
//!   ├─ run producer, check the value type
//!   └─ cache (unless prototype) ──────────────────────────► return
//! ```
//!
//! # Examples
//! ```rust
//! use mawrid_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! struct Service {
//!     greeter: Arc<dyn Greeter>,
//! }
//!
//! let injector = Injector::new();
//! injector.register(&Identity::<dyn Greeter>::of(), |_| {
//!     Ok(Arc::new(English) as Arc<dyn Greeter>)
//! });
//! injector.register(&Identity::<Service>::of(), |r| {
//!     let greeter = r.resolve(&Identity::<dyn Greeter>::of())?;
//!     Ok(Arc::new(Service { greeter }))
//! });
//!
//! let service = injector.resolve(&Identity::<Service>::of()).expect("Failed to resolve");
//! assert_eq!(service.greeter.greet(), "hello");
//! ```

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace, warn};

use crate::constructor::{ConstructorEntry, ConstructorTable};
use crate::error::{MawridError, NotFoundReason, Result};
use crate::guard::{ResolutionGuard, WaitGraph};
use crate::identity::{AnyIdentity, AutoCreate, Identity, IdentityKey};
use crate::instance::Instance;
use crate::lifecycle::Lifecycle;
use crate::module::Module;
use crate::resolvable::{Registrar, RegistrarExt, Resolvable, ResolvableExt, type_mismatch};
use crate::settings::InjectorSettings;
use crate::store::{Registration, Resolver, Store};

static NEXT_INJECTOR_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================
// InjectorBuilder
// ============================================================

/// Builds an [`Injector`].
///
/// ```rust,ignore
/// let injector = Injector::builder()
///     .settings(settings)
///     .constructor(ConstructorEntry::default_of::<Clock>())
///     .build();
/// ```
pub struct InjectorBuilder {
    settings: InjectorSettings,
    store: Option<Arc<dyn Store>>,
    constructors: ConstructorTable,
}

impl InjectorBuilder {
    fn new() -> Self {
        Self {
            settings: InjectorSettings::default(),
            store: None,
            constructors: ConstructorTable::new(),
        }
    }

    pub fn settings(mut self, settings: InjectorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use this store instead of the one the settings describe.
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the instance constructor table.
    pub fn constructors(mut self, table: ConstructorTable) -> Self {
        self.constructors = table;
        self
    }

    pub fn constructor(mut self, entry: ConstructorEntry) -> Self {
        self.constructors.register(entry);
        self
    }

    pub fn build(self) -> Injector {
        let store = self
            .store
            .unwrap_or_else(|| self.settings.build_store());
        let id = NEXT_INJECTOR_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            injector = id,
            store = %self.settings.store,
            constructors = self.constructors.len(),
            "Built injector"
        );
        Injector {
            id,
            store,
            constructors: RwLock::new(self.constructors),
            settings: self.settings,
            production: DashMap::new(),
            waits: WaitGraph::default(),
        }
    }
}

// ═══════════════════════════════════════════
// Injector
// ═══════════════════════════════════════════

/// Thread-safe dependency injector.
///
/// Owns no registry state of its own: producers and cached values live
/// in the [`Store`]. The injector only coordinates production so each
/// non-prototype identity is produced at most once at a time.
pub struct Injector {
    id: u64,
    store: Arc<dyn Store>,
    constructors: RwLock<ConstructorTable>,
    settings: InjectorSettings,
    production: DashMap<IdentityKey, Arc<Mutex<()>>>,
    waits: WaitGraph,
}

impl Injector {
    /// An injector with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn settings(&self) -> &InjectorSettings {
        &self.settings
    }

    // ── Registration ──

    /// Registers an already built value.
    pub fn register_value<V>(&self, identity: &Identity<V>, value: Arc<V>)
    where
        V: ?Sized + Send + Sync + 'static,
    {
        RegistrarExt::register_value(self, identity, value);
    }

    /// Registers a producer.
    ///
    /// The producer receives the injector so it can resolve its own
    /// dependencies.
    pub fn register<V, F>(&self, identity: &Identity<V>, producer: F)
    where
        V: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn Resolvable) -> Result<Arc<V>> + Send + Sync + 'static,
    {
        RegistrarExt::register(self, identity, producer);
    }

    /// Registers a producer built from the constructor table, using the
    /// identity's auto-create type (or its own type).
    ///
    /// Returns `false` and registers nothing when no constructor is known.
    pub fn register_auto<V>(&self, identity: &Identity<V>) -> bool
    where
        V: ?Sized + Send + Sync + 'static,
    {
        RegistrarExt::register_auto(self, identity)
    }

    pub fn register_alias<A, R>(&self, alias: &Identity<A>, reference: &Identity<R>)
    where
        A: ?Sized + Send + Sync + 'static,
        R: ?Sized + Send + Sync + 'static,
    {
        RegistrarExt::register_alias(self, alias, reference);
    }

    /// Adds a constructor to this injector's table.
    pub fn register_constructor(&self, entry: ConstructorEntry) {
        debug!(entry = ?entry, "Registered constructor");
        self.constructors.write().register(entry);
    }

    /// Runs a module's registrations against this injector.
    pub fn install(&self, module: &dyn Module) {
        debug!(module = module.name(), "Installing module");
        module.register(self);
    }

    // ── Removal ──

    pub fn remove<V>(&self, identity: &Identity<V>)
    where
        V: ?Sized + Send + Sync + 'static,
    {
        RegistrarExt::remove(self, identity);
    }

    /// Removes by `(type, key)`.
    pub fn remove_type<V>(&self, key: Option<&str>)
    where
        V: ?Sized + Send + Sync + 'static,
    {
        let identity = match key {
            Some(key) => Identity::<V>::named(key),
            None => Identity::<V>::of(),
        };
        self.remove(&identity);
    }

    /// Drops every producer, cached value and alias.
    pub fn remove_all(&self) {
        self.store.remove_all();
        self.production.clear();
    }

    // ── Resolution ──

    pub fn resolve<V>(&self, identity: &Identity<V>) -> Result<Arc<V>>
    where
        V: ?Sized + Send + Sync + 'static,
    {
        ResolvableExt::resolve(self, identity)
    }

    /// Resolves by `(type, key)`.
    ///
    /// ```rust,ignore
    /// let url: Arc<String> = injector.resolve_type(Some("database_url"))?;
    /// ```
    pub fn resolve_type<V>(&self, key: Option<&str>) -> Result<Arc<V>>
    where
        V: ?Sized + Send + Sync + 'static,
    {
        ResolvableExt::resolve_type(self, key)
    }

    // ── Counters ──

    pub fn resolvers_count(&self) -> usize {
        self.store.resolvers_count()
    }

    pub fn resolved_count(&self) -> usize {
        self.store.resolved_count()
    }

    // ── Internal ──

    /// Cached value for `identity`, directly or through its alias.
    fn cached(&self, identity: &AnyIdentity) -> Option<Instance> {
        if let Some(value) = self
            .store
            .get_resolved(identity)
            .and_then(|found| coerce(identity, found))
        {
            trace!(identity = %identity, "Cache hit");
            return Some(value);
        }

        let aliases = self.store.as_aliasing()?;
        let value = coerce(identity, aliases.get_aliased_resolved(identity)?)?;
        trace!(identity = %identity, "Cache hit through alias");
        Some(value)
    }

    /// Finds or synthesizes a producer, runs it and caches the result.
    #[instrument(level = "debug", skip(self, identity), fields(identity = %identity))]
    fn produce(&self, identity: &AnyIdentity) -> Result<Instance> {
        let _guard = ResolutionGuard::enter(self.id, identity)?;

        let (registration, through_alias) = self.find_producer(identity)?;
        let lifecycle = identity
            .lifecycle()
            .merge(registration.identity().lifecycle());

        if lifecycle.is_prototype() {
            return self.run(identity, &registration, through_alias, lifecycle);
        }

        let lock = self.production_lock(identity);
        let _held = self.waits.acquire(&lock, identity)?;
        // another thread may have finished while we waited
        if let Some(value) = self.cached(identity) {
            return Ok(value);
        }
        self.run(identity, &registration, through_alias, lifecycle)
    }

    fn find_producer(&self, identity: &AnyIdentity) -> Result<(Registration, bool)> {
        if let Some(registration) = self.store.get_resolver(identity) {
            return Ok((registration, false));
        }

        if let Some(registration) = self
            .store
            .as_aliasing()
            .and_then(|aliases| aliases.get_aliased_resolver(identity))
        {
            trace!(identity = %identity, reference = %registration.identity(), "Following alias");
            return Ok((registration, true));
        }

        if !self.settings.auto_construct {
            return Err(MawridError::not_found(identity, NotFoundReason::NoProvider));
        }
        let resolver = self.synthesize(identity)?;
        debug!(identity = %identity, "Registered constructed producer");
        self.store.put_resolver(identity, resolver.clone());
        Ok((Registration::new(identity.clone(), resolver), false))
    }

    fn run(
        &self,
        identity: &AnyIdentity,
        registration: &Registration,
        through_alias: bool,
        lifecycle: Lifecycle,
    ) -> Result<Instance> {
        let produced = registration.invoke(self)?;
        let value = coerce(identity, produced.clone())
            .ok_or_else(|| type_mismatch(identity, &produced))?;

        if lifecycle.is_cached() {
            if through_alias {
                // the reference slot keeps the reference's own type
                if let Some(aliases) = self.store.as_aliasing() {
                    aliases.put_aliased_resolved(identity, produced);
                }
            } else {
                self.store.put_resolved(identity, value.clone());
            }
        }
        Ok(value)
    }

    /// Builds a producer from the constructor table.
    fn synthesize(&self, identity: &AnyIdentity) -> Result<Resolver> {
        let target = identity
            .auto_create()
            .map(AutoCreate::target)
            .or(identity.type_ref())
            .ok_or_else(|| MawridError::not_found(identity, NotFoundReason::NoProvider))?;

        let entry = self.find_constructor(target.id()).ok_or_else(|| {
            debug!(identity = %identity, target = %target.short_name(), "No constructor known");
            MawridError::not_found(identity, NotFoundReason::TypeNotConstructible)
        })?;

        let wanted = identity.clone();
        Ok(Arc::new(move |resolver: &dyn Resolvable| {
            let built = entry
                .construct(resolver)
                .ok_or_else(|| MawridError::not_found(&wanted, NotFoundReason::ConstructorMismatch))??;
            coerce(&wanted, built.clone()).ok_or_else(|| type_mismatch(&wanted, &built))
        }))
    }

    fn find_constructor(&self, type_id: TypeId) -> Option<ConstructorEntry> {
        if let Some(entry) = self.constructors.read().get(type_id) {
            return Some(*entry);
        }
        if self.settings.use_linked_constructors {
            return ConstructorTable::linked().get(type_id).copied();
        }
        None
    }

    fn production_lock(&self, identity: &AnyIdentity) -> Arc<Mutex<()>> {
        self.production
            .entry(identity.identity_key())
            .or_default()
            .clone()
    }
}

/// The instance as `identity`'s value type, casting through the
/// auto-create target when the types differ.
fn coerce(identity: &AnyIdentity, instance: Instance) -> Option<Instance> {
    if instance.value_type() == identity.value_type() {
        return Some(instance);
    }
    identity.auto_create()?.cast(instance)
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("id", &self.id)
            .field("resolvers", &self.store.resolvers_count())
            .field("resolved", &self.store.resolved_count())
            .field("store", &self.store)
            .finish()
    }
}

impl Resolvable for Injector {
    fn resolve_any(&self, identity: &AnyIdentity) -> Result<Instance> {
        if let Some(value) = self.cached(identity) {
            return Ok(value);
        }
        self.produce(identity)
    }
}

impl Registrar for Injector {
    fn register_instance(&self, identity: &AnyIdentity, instance: Instance) {
        debug!(identity = %identity, "Registered value");
        self.store.put_resolved(identity, instance);
    }

    fn register_resolver(&self, identity: &AnyIdentity, resolver: Resolver) {
        self.store.put_resolver(identity, resolver);
    }

    fn register_constructed(&self, identity: &AnyIdentity) -> bool {
        match self.synthesize(identity) {
            Ok(resolver) => {
                self.store.put_resolver(identity, resolver);
                true
            }
            Err(err) => {
                warn!(identity = %identity, error = %err, "No constructor to register");
                false
            }
        }
    }

    fn register_alias_any(&self, alias: &AnyIdentity, reference: &AnyIdentity) {
        match self.store.as_aliasing() {
            Some(aliases) => aliases.register_alias(alias, reference),
            None => warn!(alias = %alias, "Store does not support aliases"),
        }
    }

    fn remove_any(&self, identity: &AnyIdentity) {
        self.store.remove(identity);
        self.production.remove(&identity.identity_key());
    }
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructor::Injectable;
    use crate::settings::StoreKind;
    use crate::weak_store::WeakStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Barrier, Weak};
    use std::thread;
    use std::time::Duration;

    trait Engine: Send + Sync {
        fn power(&self) -> u32;
    }

    #[derive(Debug, Default)]
    struct Diesel;

    impl Engine for Diesel {
        fn power(&self) -> u32 {
            150
        }
    }

    struct Car {
        engine: Arc<dyn Engine>,
    }

    impl Injectable for Car {
        fn inject(resolver: &dyn Resolvable) -> Result<Self> {
            let engine = resolver.resolve(&Identity::<dyn Engine>::of())?;
            Ok(Car { engine })
        }
    }

    fn counting<V: Send + Sync + 'static>(
        calls: &Arc<AtomicU32>,
        make: fn() -> V,
    ) -> impl Fn(&dyn Resolvable) -> Result<Arc<V>> + Send + Sync + 'static {
        let calls = calls.clone();
        move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(make()))
        }
    }

    fn isolated() -> Injector {
        Injector::builder()
            .settings(InjectorSettings {
                use_linked_constructors: false,
                ..Default::default()
            })
            .build()
    }

    #[test]
    fn singleton_produced_once() {
        let injector = isolated();
        let calls = Arc::new(AtomicU32::new(0));
        let id = Identity::<String>::of();
        injector.register(&id, counting(&calls, || String::from("db")));

        let a = injector.resolve(&id).unwrap();
        let b = injector.resolve(&id).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(injector.resolved_count(), 1);
    }

    #[test]
    fn prototype_produced_every_time() {
        let injector = isolated();
        let calls = Arc::new(AtomicU32::new(0));
        let id = Identity::<String>::of().prototype();
        injector.register(&id, counting(&calls, || String::from("fresh")));

        let a = injector.resolve(&id).unwrap();
        let b = injector.resolve(&id).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(injector.resolved_count(), 0);
    }

    #[test]
    fn caller_prototype_flag_skips_cache() {
        let injector = isolated();
        let calls = Arc::new(AtomicU32::new(0));
        injector.register(&Identity::<u32>::of(), counting(&calls, || 1u32));

        let fresh = Identity::<u32>::of().prototype();
        injector.resolve(&fresh).unwrap();
        injector.resolve(&fresh).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(injector.resolved_count(), 0);
    }

    #[test]
    fn registered_value_is_returned_as_is() {
        let injector = isolated();
        let value = Arc::new(String::from("config"));
        injector.register_value(&Identity::<String>::named("cfg"), value.clone());

        let found = injector.resolve_type::<String>(Some("cfg")).unwrap();
        assert!(Arc::ptr_eq(&found, &value));
        assert_eq!(injector.resolvers_count(), 0);
    }

    #[test]
    fn producer_resolves_dependencies() {
        let injector = isolated();
        injector.register(&Identity::<dyn Engine>::of(), |_| {
            Ok(Arc::new(Diesel) as Arc<dyn Engine>)
        });
        injector.register(&Identity::<Car>::of(), |r| Ok(Arc::new(Car::inject(r)?)));

        let car = injector.resolve(&Identity::<Car>::of()).unwrap();
        assert_eq!(car.engine.power(), 150);
        assert_eq!(injector.resolved_count(), 2);
    }

    #[test]
    fn alias_forwards_and_caches_once() {
        let injector = isolated();
        let calls = Arc::new(AtomicU32::new(0));
        let reference = Identity::<u32>::of();
        let alias = Identity::<u32>::named("answer");
        injector.register(&reference, counting(&calls, || 42u32));
        injector.register_alias(&alias, &reference);

        let through_alias = injector.resolve(&alias).unwrap();
        assert_eq!(*through_alias, 42);
        assert_eq!(injector.resolved_count(), 1);

        let direct = injector.resolve(&reference).unwrap();
        assert!(Arc::ptr_eq(&through_alias, &direct));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(injector.resolved_count(), 1);
    }

    #[test]
    fn alias_reads_existing_reference_value() {
        let injector = isolated();
        let reference = Identity::<u32>::of();
        let alias = Identity::<u32>::named("answer");
        injector.register(&reference, |_| Ok(Arc::new(7u32)));
        injector.register_alias(&alias, &reference);

        let direct = injector.resolve(&reference).unwrap();
        let through_alias = injector.resolve(&alias).unwrap();
        assert!(Arc::ptr_eq(&direct, &through_alias));
    }

    #[test]
    fn alias_prefers_cached_reference_value() {
        let injector = isolated();
        let reference = Identity::<u32>::of();
        let alias = Identity::<u32>::named("alias").prototype();
        injector.register(&reference, |_| Ok(Arc::new(1u32)));
        injector.register_alias(&alias, &reference);

        let cached = Arc::new(99u32);
        injector.store().put_resolved(reference.erased(), Instance::new(cached.clone()));

        let found = injector.resolve(&alias).unwrap();
        assert!(Arc::ptr_eq(&found, &cached));
    }

    #[test]
    fn direct_producer_beats_alias() {
        let injector = isolated();
        let reference = Identity::<u32>::of();
        let alias = Identity::<u32>::named("alias");
        injector.register(&reference, |_| Ok(Arc::new(1u32)));
        injector.register(&alias, |_| Ok(Arc::new(2u32)));
        injector.register_alias(&alias, &reference);

        assert_eq!(*injector.resolve(&alias).unwrap(), 2);
        assert_eq!(*injector.resolve(&reference).unwrap(), 1);
    }

    #[test]
    fn not_found_names_type_and_key() {
        let injector = isolated();
        let err = injector
            .resolve(&Identity::<String>::named("missing"))
            .unwrap_err();

        assert_eq!(err.code(), "dependencyNotFound");
        assert_eq!(err.reason(), Some(NotFoundReason::TypeNotConstructible));
        let msg = err.to_string();
        assert!(msg.contains("String"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn key_only_identity_has_nothing_to_construct() {
        let injector = isolated();
        let err = injector.resolve(&Identity::<String>::keyed("k")).unwrap_err();
        assert_eq!(err.reason(), Some(NotFoundReason::NoProvider));
    }

    #[test]
    fn keyed_identities_share_a_slot() {
        let injector = isolated();
        injector.register_value(&Identity::<u32>::keyed("shared"), Arc::new(5u32));

        let err = injector.resolve(&Identity::<String>::keyed("shared")).unwrap_err();
        assert_eq!(err.reason(), Some(NotFoundReason::NoProvider));
        assert_eq!(*injector.resolve(&Identity::<u32>::keyed("shared")).unwrap(), 5);
    }

    #[test]
    fn producer_of_wrong_type_is_a_mismatch() {
        let injector = isolated();
        injector.register_resolver(
            Identity::<String>::keyed("port").erased(),
            Arc::new(|_: &dyn Resolvable| Ok(Instance::from_value(8080u16))),
        );

        let err = injector.resolve(&Identity::<String>::keyed("port")).unwrap_err();
        assert_eq!(err.reason(), Some(NotFoundReason::TypeMismatch));
        assert!(err.to_string().contains("expected String, found u16"));
    }

    #[test]
    fn producer_failure_propagates() {
        let injector = isolated();
        injector.register(&Identity::<String>::of(), |r| {
            r.resolve(&Identity::<u64>::keyed("absent"))
                .map(|n| Arc::new(n.to_string()))
        });

        let err = injector.resolve(&Identity::<String>::of()).unwrap_err();
        assert!(err.to_string().contains("key: absent"));
        assert_eq!(injector.resolved_count(), 0);
    }

    #[test]
    fn remove_drops_producer_and_value() {
        let injector = isolated();
        let id = Identity::<u32>::of();
        injector.register(&id, |_| Ok(Arc::new(3u32)));
        injector.resolve(&id).unwrap();

        injector.remove(&id);
        assert_eq!(injector.resolvers_count(), 0);
        assert_eq!(injector.resolved_count(), 0);
        assert!(injector.resolve(&id).is_err());
    }

    #[test]
    fn remove_type_and_remove_all() {
        let injector = isolated();
        injector.register(&Identity::<u32>::named("a"), |_| Ok(Arc::new(1u32)));
        injector.register(&Identity::<u64>::of(), |_| Ok(Arc::new(2u64)));
        injector.register_alias(&Identity::<u32>::named("b"), &Identity::<u32>::named("a"));

        injector.remove_type::<u32>(Some("a"));
        assert_eq!(injector.resolvers_count(), 1);

        injector.remove_all();
        assert_eq!(injector.resolvers_count(), 0);
        assert!(injector.resolve(&Identity::<u32>::named("b")).is_err());
    }

    #[test]
    fn last_registration_owns_lifecycle() {
        let injector = isolated();
        let calls = Arc::new(AtomicU32::new(0));
        injector.register(&Identity::<u32>::of(), counting(&calls, || 1u32));
        injector.register(&Identity::<u32>::of().prototype(), counting(&calls, || 2u32));

        assert_eq!(injector.resolvers_count(), 1);
        // plain caller identity, prototype registration
        let plain = Identity::<u32>::of();
        assert_eq!(*injector.resolve(&plain).unwrap(), 2);
        assert_eq!(*injector.resolve(&plain).unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(injector.resolved_count(), 0);
    }

    #[test]
    fn weak_store_recomputes_dropped_singleton() {
        let injector = Injector::builder()
            .store(Arc::new(WeakStore::new()))
            .build();
        let calls = Arc::new(AtomicU32::new(0));
        let id = Identity::<String>::of();
        injector.register(&id, counting(&calls, || String::from("session")));

        let first = injector.resolve(&id).unwrap();
        let again = injector.resolve(&id).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let observer: Weak<String> = Arc::downgrade(&first);
        drop(first);
        drop(again);
        assert!(observer.upgrade().is_none());

        injector.resolve(&id).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn weak_store_with_strong_references_keeps_values() {
        let injector = Injector::builder()
            .settings(InjectorSettings {
                store: StoreKind::Weak,
                strong_references: true,
                ..Default::default()
            })
            .build();
        let calls = Arc::new(AtomicU32::new(0));
        let id = Identity::<String>::of();
        injector.register(&id, counting(&calls, || String::from("kept")));

        drop(injector.resolve(&id).unwrap());
        drop(injector.resolve(&id).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug)]
    struct Ping;
    #[derive(Debug)]
    struct Pong;

    #[test]
    fn cycle_is_reported_not_overflowed() {
        let injector = isolated();
        injector.register(&Identity::<Ping>::of(), |r| {
            r.resolve(&Identity::<Pong>::of())?;
            Ok(Arc::new(Ping))
        });
        injector.register(&Identity::<Pong>::of(), |r| {
            r.resolve(&Identity::<Ping>::of())?;
            Ok(Arc::new(Pong))
        });

        let err = injector.resolve(&Identity::<Ping>::of()).unwrap_err();
        assert!(err.is_circular());
        match err {
            MawridError::CircularDependency(cycle) => {
                assert_eq!(cycle.chain, vec!["Ping", "Pong", "Ping"]);
            }
            other => panic!("expected a cycle, got: {other:?}"),
        }

        // the failed attempt leaves nothing in flight
        injector.register(&Identity::<Pong>::of(), |_| Ok(Arc::new(Pong)));
        assert!(injector.resolve(&Identity::<Ping>::of()).is_ok());
    }

    #[test]
    fn concurrent_first_resolution_produces_once() {
        let injector = Arc::new(isolated());
        let calls = Arc::new(AtomicU32::new(0));
        let id = Identity::<String>::of();
        injector.register(&id, {
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                Ok(Arc::new(String::from("pool")))
            }
        });

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let injector = injector.clone();
                let barrier = barrier.clone();
                let id = id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    injector.resolve(&id).unwrap()
                })
            })
            .collect();

        let values: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[test]
    fn constructs_unregistered_type_from_table() {
        let injector = Injector::builder()
            .settings(InjectorSettings {
                use_linked_constructors: false,
                ..Default::default()
            })
            .constructor(ConstructorEntry::injectable::<Car>())
            .build();
        injector.register(&Identity::<dyn Engine>::of(), |_| {
            Ok(Arc::new(Diesel) as Arc<dyn Engine>)
        });

        let car = injector.resolve(&Identity::<Car>::of()).unwrap();
        assert_eq!(car.engine.power(), 150);
        // the synthesized producer was registered
        assert_eq!(injector.resolvers_count(), 2);
    }

    #[test]
    fn auto_create_target_casts_to_capability() {
        let injector = isolated();
        injector.register_constructor(ConstructorEntry::default_of::<Diesel>());

        let id = Identity::<dyn Engine>::of().auto_create::<Diesel>(|it| it);
        let engine = injector.resolve(&id).unwrap();
        assert_eq!(engine.power(), 150);

        // a plain identity now finds the cached value
        let again = injector.resolve(&Identity::<dyn Engine>::of()).unwrap();
        assert!(Arc::ptr_eq(&engine, &again));
    }

    #[test]
    fn register_auto_reports_missing_constructor() {
        let injector = isolated();
        let id = Identity::<dyn Engine>::of().auto_create::<Diesel>(|it| it);
        assert!(!injector.register_auto(&id));
        assert_eq!(injector.resolvers_count(), 0);

        injector.register_constructor(ConstructorEntry::default_of::<Diesel>());
        assert!(injector.register_auto(&id));
        assert_eq!(injector.resolve(&Identity::<dyn Engine>::of()).unwrap().power(), 150);
    }

    #[test]
    fn register_auto_keeps_prototype_lifecycle() {
        let injector = isolated();
        injector.register_constructor(ConstructorEntry::default_of::<Diesel>());
        let id = Identity::<dyn Engine>::register::<Diesel>(None, Lifecycle::Prototype, |it| it);
        assert!(injector.register_auto(&id));

        let a = injector.resolve(&Identity::<dyn Engine>::of()).unwrap();
        let b = injector.resolve(&Identity::<dyn Engine>::of()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn auto_construct_can_be_disabled() {
        let injector = Injector::builder()
            .settings(InjectorSettings {
                auto_construct: false,
                ..Default::default()
            })
            .constructor(ConstructorEntry::default_of::<Diesel>())
            .build();

        let err = injector.resolve(&Identity::<Diesel>::of()).unwrap_err();
        assert_eq!(err.reason(), Some(NotFoundReason::NoProvider));
    }

    #[test]
    fn register_auto_ignores_auto_construct_flag() {
        let injector = Injector::builder()
            .settings(InjectorSettings {
                auto_construct: false,
                use_linked_constructors: false,
                ..Default::default()
            })
            .constructor(ConstructorEntry::default_of::<Diesel>())
            .build();

        assert!(injector.register_auto(&Identity::<Diesel>::of()));
        assert_eq!(injector.resolvers_count(), 1);
        assert_eq!(injector.resolve(&Identity::<Diesel>::of()).unwrap().power(), 150);
    }

    #[test]
    fn producer_reports_own_failure() {
        let injector = isolated();
        injector.register_value(&Identity::<String>::named("raw_port"), Arc::new("eighty".into()));
        injector.register(&Identity::<u16>::named("port"), |r| {
            let raw = r.resolve(&Identity::<String>::named("raw_port"))?;
            raw.parse::<u16>().map(Arc::new).map_err(|err| {
                MawridError::producer_failed(Identity::<u16>::named("port").erased(), err)
            })
        });

        let err = injector.resolve(&Identity::<u16>::named("port")).unwrap_err();
        assert_eq!(err.reason(), Some(NotFoundReason::ProducerFailed));
        assert!(err.to_string().contains("invalid digit"));
        assert!(!err.user_message().contains("invalid digit"));
    }

    struct North;
    struct South;

    #[test]
    fn cycle_across_threads_fails_instead_of_hanging() {
        let injector = Arc::new(isolated());
        let barrier = Arc::new(Barrier::new(2));
        let first_calls = Arc::new(AtomicU32::new(0));

        // each producer meets the other thread once, then asks for the other side
        injector.register(&Identity::<North>::of(), {
            let barrier = barrier.clone();
            let first_calls = first_calls.clone();
            move |r| {
                if first_calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    barrier.wait();
                }
                r.resolve(&Identity::<South>::of())?;
                Ok(Arc::new(North))
            }
        });
        injector.register(&Identity::<South>::of(), {
            let barrier = barrier.clone();
            let first_calls = first_calls.clone();
            move |r| {
                if first_calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    barrier.wait();
                }
                r.resolve(&Identity::<North>::of())?;
                Ok(Arc::new(South))
            }
        });

        let (tx, rx) = std::sync::mpsc::channel();
        {
            let injector = injector.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let failed = injector.resolve(&Identity::<North>::of()).err();
                let _ = tx.send(failed.map(|err| err.is_circular()));
            });
        }
        {
            let injector = injector.clone();
            thread::spawn(move || {
                let failed = injector.resolve(&Identity::<South>::of()).err();
                let _ = tx.send(failed.map(|err| err.is_circular()));
            });
        }

        for _ in 0..2 {
            let outcome = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("resolution should not block forever");
            assert_eq!(outcome, Some(true));
        }
        assert_eq!(injector.resolved_count(), 0);
    }

    #[test]
    fn debug_output() {
        let injector = isolated();
        injector.register_value(&Identity::<u8>::of(), Arc::new(1u8));
        let debug = format!("{injector:?}");
        assert!(debug.contains("Injector"));
        assert!(debug.contains("resolved: 1"));
    }
}
