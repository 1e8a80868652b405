//! The object-safe faces of the engine.
//!
//! Producers receive a `&dyn Resolvable` so they can resolve their own
//! dependencies; modules receive a `&dyn Registrar`. Both traits work on
//! erased identities. The `*Ext` traits add the typed methods on top
//! and are implemented for every resolver and registrar, trait objects
//! included.

use std::sync::Arc;

use crate::error::{MawridError, NotFoundReason, Result};
use crate::identity::{AnyIdentity, Identity, ResolvableIdentity};
use crate::instance::Instance;
use crate::store::Resolver;

/// Something that can resolve identities.
pub trait Resolvable: Send + Sync {
    /// Resolves `identity` to an instance of its value type.
    fn resolve_any(&self, identity: &AnyIdentity) -> Result<Instance>;
}

/// Typed resolution helpers.
///
/// ```rust,ignore
/// injector.register(&Identity::<Mailer>::of(), |r| {
///     let smtp = r.resolve(&Identity::<SmtpClient>::of())?;
///     Ok(Arc::new(Mailer { smtp }))
/// });
/// ```
pub trait ResolvableExt: Resolvable {
    fn resolve<V>(&self, identity: &Identity<V>) -> Result<Arc<V>>
    where
        V: ?Sized + Send + Sync + 'static,
    {
        let instance = self.resolve_any(identity.erased())?;
        downcast_instance(identity.erased(), &instance)
    }

    /// Resolves by the looser `(type, key)` pair.
    fn resolve_type<V>(&self, key: Option<&str>) -> Result<Arc<V>>
    where
        V: ?Sized + Send + Sync + 'static,
    {
        let identity = match key {
            Some(key) => ResolvableIdentity::<V>::named(key),
            None => ResolvableIdentity::<V>::of(),
        };
        self.resolve(&identity.into_identity())
    }

    /// Resolves and drops any failure.
    fn try_resolve<V>(&self, identity: &Identity<V>) -> Option<Arc<V>>
    where
        V: ?Sized + Send + Sync + 'static,
    {
        self.resolve(identity).ok()
    }
}

impl<R: Resolvable + ?Sized> ResolvableExt for R {}

pub(crate) fn downcast_instance<V>(identity: &AnyIdentity, instance: &Instance) -> Result<Arc<V>>
where
    V: ?Sized + Send + Sync + 'static,
{
    instance.downcast::<V>().ok_or_else(|| type_mismatch(identity, instance))
}

pub(crate) fn type_mismatch(identity: &AnyIdentity, instance: &Instance) -> MawridError {
    crate::error::DependencyNotFoundError::new(identity, NotFoundReason::TypeMismatch)
        .with_cause(format!(
            "expected {}, found {}",
            identity.value_type().short_name(),
            instance.value_type().short_name()
        ))
        .into()
}

/// Something that accepts registrations.
pub trait Registrar {
    /// Stores an already produced value.
    fn register_instance(&self, identity: &AnyIdentity, instance: Instance);

    /// Stores a producer.
    fn register_resolver(&self, identity: &AnyIdentity, resolver: Resolver);

    /// Stores a producer built from the constructor table.
    ///
    /// Returns `false` when no constructor is known for the identity.
    fn register_constructed(&self, identity: &AnyIdentity) -> bool;

    /// Makes `alias` forward to `reference`.
    fn register_alias_any(&self, alias: &AnyIdentity, reference: &AnyIdentity);

    /// Drops the producer and cached value of `identity`.
    fn remove_any(&self, identity: &AnyIdentity);
}

/// Typed registration helpers.
pub trait RegistrarExt: Registrar {
    fn register_value<V>(&self, identity: &Identity<V>, value: Arc<V>)
    where
        V: ?Sized + Send + Sync + 'static,
    {
        self.register_instance(identity.erased(), Instance::new(value));
    }

    fn register<V, F>(&self, identity: &Identity<V>, producer: F)
    where
        V: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn Resolvable) -> Result<Arc<V>> + Send + Sync + 'static,
    {
        let resolver: Resolver = Arc::new(move |r: &dyn Resolvable| producer(r).map(Instance::new));
        self.register_resolver(identity.erased(), resolver);
    }

    fn register_auto<V>(&self, identity: &Identity<V>) -> bool
    where
        V: ?Sized + Send + Sync + 'static,
    {
        self.register_constructed(identity.erased())
    }

    fn register_alias<A, R>(&self, alias: &Identity<A>, reference: &Identity<R>)
    where
        A: ?Sized + Send + Sync + 'static,
        R: ?Sized + Send + Sync + 'static,
    {
        self.register_alias_any(alias.erased(), reference.erased());
    }

    fn remove<V>(&self, identity: &Identity<V>)
    where
        V: ?Sized + Send + Sync + 'static,
    {
        self.remove_any(identity.erased());
    }
}

impl<R: Registrar + ?Sized> RegistrarExt for R {}
