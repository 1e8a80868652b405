//! Lazy injection handles.
//!
//! A struct that needs a dependency but should not resolve it while it is
//! being built holds an [`Inject`] (the dependency is required) or an
//! [`InjectSafe`] (the dependency may be missing). Both resolve on first
//! access and keep the result.
//!
//! ```rust,ignore
//! struct Handler {
//!     mailer: Inject<dyn Mailer>,
//!     audit: InjectSafe<AuditLog>,
//! }
//!
//! let handler = Handler {
//!     mailer: Inject::of(injector.clone()),
//!     audit: InjectSafe::of(injector.clone()),
//! };
//! handler.mailer.get().send("hi");
//! if let Some(audit) = handler.audit.get() { audit.record("sent"); }
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{DependencyNotFoundError, NotFoundReason, Result};
use crate::identity::{Identity, ResolvableIdentity};
use crate::injector::Injector;
use crate::resolvable::{Resolvable, ResolvableExt};

fn resolve_with<V>(resolver: Option<&Arc<dyn Resolvable>>, identity: &Identity<V>) -> Result<Arc<V>>
where
    V: ?Sized + Send + Sync + 'static,
{
    match resolver {
        Some(resolver) => resolver.resolve(identity),
        None => Err(DependencyNotFoundError::new(identity.erased(), NotFoundReason::ContainerMissing)
            .with_message("DI container not specified")
            .into()),
    }
}

/// A required dependency, resolved on first access.
pub struct Inject<V: ?Sized> {
    resolver: Option<Arc<dyn Resolvable>>,
    identity: Identity<V>,
    value: OnceCell<Arc<V>>,
}

impl<V: ?Sized + Send + Sync + 'static> Inject<V> {
    pub fn new(resolver: Arc<dyn Resolvable>, identity: Identity<V>) -> Self {
        Self {
            resolver: Some(resolver),
            identity,
            value: OnceCell::new(),
        }
    }

    /// Resolves `V` without a key.
    pub fn of(resolver: Arc<dyn Resolvable>) -> Self {
        Self::new(resolver, Identity::of())
    }

    pub fn from_resolvable(resolver: Arc<dyn Resolvable>, identity: ResolvableIdentity<V>) -> Self {
        Self::new(resolver, identity.into_identity())
    }

    /// A handle with no container. Every access fails.
    pub fn detached(identity: Identity<V>) -> Self {
        Self {
            resolver: None,
            identity,
            value: OnceCell::new(),
        }
    }

    /// The dependency, resolving it on first call.
    ///
    /// # Panics
    /// If the dependency cannot be resolved. Use [`try_get`](Self::try_get)
    /// to handle the failure instead.
    pub fn get(&self) -> Arc<V> {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// The dependency, or why it could not be resolved.
    ///
    /// A failure is not remembered; the next call tries again.
    pub fn try_get(&self) -> Result<Arc<V>> {
        self.value
            .get_or_try_init(|| resolve_with(self.resolver.as_ref(), &self.identity))
            .map(Arc::clone)
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn identity(&self) -> &Identity<V> {
        &self.identity
    }
}

impl<V: ?Sized> fmt::Debug for Inject<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("identity", &self.identity)
            .field("resolved", &self.value.get().is_some())
            .finish()
    }
}

/// An optional dependency, resolved on first access.
///
/// A failed resolution reads as `None` and is remembered, so the
/// container is asked at most once.
pub struct InjectSafe<V: ?Sized> {
    resolver: Option<Arc<dyn Resolvable>>,
    identity: Identity<V>,
    value: OnceCell<Option<Arc<V>>>,
}

impl<V: ?Sized + Send + Sync + 'static> InjectSafe<V> {
    pub fn new(resolver: Arc<dyn Resolvable>, identity: Identity<V>) -> Self {
        Self {
            resolver: Some(resolver),
            identity,
            value: OnceCell::new(),
        }
    }

    pub fn of(resolver: Arc<dyn Resolvable>) -> Self {
        Self::new(resolver, Identity::of())
    }

    pub fn from_resolvable(resolver: Arc<dyn Resolvable>, identity: ResolvableIdentity<V>) -> Self {
        Self::new(resolver, identity.into_identity())
    }

    /// A handle with no container. Always reads `None`.
    pub fn detached(identity: Identity<V>) -> Self {
        Self {
            resolver: None,
            identity,
            value: OnceCell::new(),
        }
    }

    /// Registers `value` under `identity`, then hands out a handle to it.
    pub fn with_value(injector: Arc<Injector>, identity: Identity<V>, value: Arc<V>) -> Self {
        injector.register_value(&identity, value);
        Self::new(injector, identity)
    }

    /// Registers `producer` under `identity`, then hands out a handle to it.
    pub fn with_producer<F>(injector: Arc<Injector>, identity: Identity<V>, producer: F) -> Self
    where
        F: Fn(&dyn Resolvable) -> Result<Arc<V>> + Send + Sync + 'static,
    {
        injector.register(&identity, producer);
        Self::new(injector, identity)
    }

    /// Registers a constructed producer under `identity` (see
    /// [`Injector::register_auto`]), then hands out a handle to it.
    pub fn with_constructor(injector: Arc<Injector>, identity: Identity<V>) -> Self {
        if !injector.register_auto(&identity) {
            debug!(identity = %identity.erased(), "Handle has no constructed producer");
        }
        Self::new(injector, identity)
    }

    /// Makes `alias` forward to `reference`, then hands out a handle to `alias`.
    pub fn with_alias<R>(injector: Arc<Injector>, alias: Identity<V>, reference: &Identity<R>) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
    {
        injector.register_alias(&alias, reference);
        Self::new(injector, alias)
    }

    /// The dependency, or `None` if it cannot be resolved.
    pub fn get(&self) -> Option<Arc<V>> {
        self.value
            .get_or_init(|| resolve_with(self.resolver.as_ref(), &self.identity).ok())
            .clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn identity(&self) -> &Identity<V> {
        &self.identity
    }
}

impl<V: ?Sized> fmt::Debug for InjectSafe<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectSafe")
            .field("identity", &self.identity)
            .field("resolved", &self.value.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MawridError;
    use crate::settings::InjectorSettings;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counted_injector(calls: &Arc<AtomicU32>) -> Arc<Injector> {
        let injector = Arc::new(Injector::new());
        let calls = calls.clone();
        injector.register(&Identity::<String>::of().prototype(), move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(String::from("lazy")))
        });
        injector
    }

    #[test]
    fn inject_resolves_once_on_first_access() {
        let calls = Arc::new(AtomicU32::new(0));
        let handle: Inject<String> = Inject::of(counted_injector(&calls));

        assert!(!handle.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let a = handle.get();
        let b = handle.get();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handle.is_resolved());
    }

    #[test]
    fn inject_try_get_reports_failure() {
        let handle: Inject<u64> = Inject::of(Arc::new(Injector::new()));
        let err = handle.try_get().unwrap_err();
        assert_eq!(err.code(), "dependencyNotFound");
        assert!(!handle.is_resolved());
    }

    #[test]
    #[should_panic(expected = "Could not find dependency for type: u64")]
    fn inject_get_panics_on_failure() {
        let handle: Inject<u64> = Inject::of(Arc::new(Injector::new()));
        handle.get();
    }

    #[test]
    fn detached_handle_reports_missing_container() {
        let handle = Inject::<String>::detached(Identity::of());
        let err = handle.try_get().unwrap_err();
        assert_eq!(err.to_string(), "DI container not specified");
        assert!(matches!(err, MawridError::DependencyNotFound(_)));
        assert_eq!(err.reason(), Some(NotFoundReason::ContainerMissing));

        assert!(InjectSafe::<String>::detached(Identity::of()).get().is_none());
    }

    #[test]
    fn inject_safe_remembers_absence() {
        let injector = Arc::new(Injector::new());
        let handle: InjectSafe<String> =
            InjectSafe::from_resolvable(injector.clone(), ResolvableIdentity::named("late"));
        assert!(handle.get().is_none());

        injector.register_value(&Identity::<String>::named("late"), Arc::new("now".into()));
        assert!(handle.get().is_none());
        assert!(handle.is_resolved());
    }

    #[test]
    fn inject_safe_registration_helpers() {
        let injector = Arc::new(Injector::new());

        let value = InjectSafe::with_value(
            injector.clone(),
            Identity::<String>::named("name"),
            Arc::new("mawrid".into()),
        );
        assert_eq!(value.get().as_deref().map(String::as_str), Some("mawrid"));

        let produced = InjectSafe::with_producer(injector.clone(), Identity::<u32>::of(), |_| {
            Ok(Arc::new(7))
        });
        assert_eq!(produced.get().as_deref(), Some(&7));

        let aliased = InjectSafe::with_alias(
            injector.clone(),
            Identity::<String>::named("alias"),
            &Identity::<String>::named("name"),
        );
        assert_eq!(aliased.get().as_deref().map(String::as_str), Some("mawrid"));
    }

    #[test]
    fn inject_safe_with_constructor() {
        #[derive(Default)]
        struct Clock;

        let injector = Arc::new(Injector::new());
        injector.register_constructor(crate::constructor::ConstructorEntry::default_of::<Clock>());

        let handle = InjectSafe::with_constructor(injector, Identity::<Clock>::of());
        assert!(handle.get().is_some());
    }

    #[test]
    fn inject_safe_with_unknown_constructor_is_empty() {
        struct Unbuildable;

        let injector = Arc::new(
            Injector::builder()
                .settings(InjectorSettings {
                    use_linked_constructors: false,
                    ..Default::default()
                })
                .build(),
        );
        let handle = InjectSafe::with_constructor(injector.clone(), Identity::<Unbuildable>::of());
        assert_eq!(injector.resolvers_count(), 0);
        assert!(handle.get().is_none());
    }
}
