//! Dependency identities.
//!
//! An [`Identity`] describes *what* to resolve: an optional nominal type,
//! an optional key, an optional implementation type to auto-create, and
//! a [`Lifecycle`].
//!
//! Equality and hashing only look at `(type, key)`. Two identities that
//! differ only in their auto-create target or lifecycle are the same
//! registry slot, and whichever was registered last owns those fields.
//!
//! # Examples
//! ```
//! use mawrid_container::identity::Identity;
//!
//! let plain = Identity::<String>::of();
//! let primary = Identity::<String>::named("primary");
//! assert_ne!(plain, primary);
//!
//! // lifecycle is not part of identity
//! assert_eq!(primary.clone().prototype(), primary);
//! ```

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use mawrid_support::rendering::shorten_type_name;

use crate::instance::Instance;
use crate::lifecycle::Lifecycle;

/// A nominal type reference: a [`TypeId`] plus its readable name.
///
/// Compared by id only.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
}

impl TypeRef {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub(crate) fn from_parts(id: TypeId, name: &'static str) -> Self {
        Self { id, name }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module paths, for diagnostics.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.name)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The `(type, key)` pair stores use as their map key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    type_id: Option<TypeId>,
    key: Option<Arc<str>>,
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKey")
            .field("type_id", &self.type_id)
            .field("key", &self.key)
            .finish()
    }
}

type CastFn = Arc<dyn Fn(Instance) -> Option<Instance> + Send + Sync>;

/// The implementation type to instantiate for an identity, together with
/// the upcast from that type to the identity's value type.
#[derive(Clone)]
pub struct AutoCreate {
    target: TypeRef,
    cast: CastFn,
}

impl AutoCreate {
    fn new<I, V>(cast: fn(Arc<I>) -> Arc<V>) -> Self
    where
        I: Send + Sync + 'static,
        V: ?Sized + Send + Sync + 'static,
    {
        Self {
            target: TypeRef::of::<I>(),
            cast: Arc::new(move |instance: Instance| {
                instance.downcast::<I>().map(|value| Instance::new(cast(value)))
            }),
        }
    }

    /// The implementation type.
    pub fn target(&self) -> TypeRef {
        self.target
    }

    /// Converts an instance of the implementation type into the value type.
    ///
    /// Returns `None` when `instance` does not hold the implementation type.
    pub fn cast(&self, instance: Instance) -> Option<Instance> {
        (self.cast)(instance)
    }
}

impl fmt::Debug for AutoCreate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AutoCreate({})", self.target.name)
    }
}

/// Type-erased identity, the form stores and the object-safe engine
/// traits work with.
#[derive(Clone)]
pub struct AnyIdentity {
    value_type: TypeRef,
    type_ref: Option<TypeRef>,
    key: Option<Arc<str>>,
    auto_create: Option<AutoCreate>,
    lifecycle: Lifecycle,
}

impl AnyIdentity {
    /// The static type resolution must yield. Not part of equality.
    #[inline]
    pub fn value_type(&self) -> TypeRef {
        self.value_type
    }

    /// The nominal type, if this identity is typed.
    #[inline]
    pub fn type_ref(&self) -> Option<TypeRef> {
        self.type_ref
    }

    #[inline]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[inline]
    pub fn auto_create(&self) -> Option<&AutoCreate> {
        self.auto_create.as_ref()
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[inline]
    pub fn is_prototype(&self) -> bool {
        self.lifecycle.is_prototype()
    }

    /// The `(type, key)` map key for this identity.
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            type_id: self.type_ref.map(|t| t.id),
            key: self.key.clone(),
        }
    }
}

impl PartialEq for AnyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.type_ref == other.type_ref && self.key == other.key
    }
}

impl Eq for AnyIdentity {}

impl Hash for AnyIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_ref.hash(state);
        self.key.hash(state);
    }
}

impl fmt::Debug for AnyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("type", &self.type_ref.map(|t| t.name))
            .field("key", &self.key)
            .field("auto_create", &self.auto_create)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

impl fmt::Display for AnyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_ref {
            Some(t) => write!(f, "{}", t.short_name())?,
            None => write!(f, "<{}>", self.value_type.short_name())?,
        }
        if let Some(key) = &self.key {
            write!(f, " (key={key:?})")?;
        }
        Ok(())
    }
}

/// Identifies a dependency that resolves to `Arc<V>`.
///
/// `V` may be unsized, so `Identity<dyn Mailer>` is a valid capability
/// identity. Use [`auto_create`](Identity::auto_create) to name the
/// concrete type that backs it.
pub struct Identity<V: ?Sized> {
    inner: AnyIdentity,
    _marker: PhantomData<fn() -> Box<V>>,
}

impl<V: ?Sized + Send + Sync + 'static> Identity<V> {
    fn from_inner(type_ref: Option<TypeRef>, key: Option<Arc<str>>) -> Self {
        Self {
            inner: AnyIdentity {
                value_type: TypeRef::of::<V>(),
                type_ref,
                key,
                auto_create: None,
                lifecycle: Lifecycle::Singleton,
            },
            _marker: PhantomData,
        }
    }

    /// An identity typed by `V`, without a key.
    pub fn of() -> Self {
        Self::from_inner(Some(TypeRef::of::<V>()), None)
    }

    /// An identity typed by `V` and disambiguated by `key`.
    pub fn named(key: impl Into<Arc<str>>) -> Self {
        Self::from_inner(Some(TypeRef::of::<V>()), Some(key.into()))
    }

    /// A key-only identity with no nominal type.
    ///
    /// Key-only identities collide with every other key-only identity
    /// using the same key, whatever their value type.
    pub fn keyed(key: impl Into<Arc<str>>) -> Self {
        Self::from_inner(None, Some(key.into()))
    }

    /// An identity with neither type nor key.
    pub fn untyped() -> Self {
        Self::from_inner(None, None)
    }

    /// Identity for registering an implementation `I` under value type `V`.
    ///
    /// `cast` performs the upcast; for trait objects a plain `|it| it`
    /// closure is enough.
    pub fn register<I>(
        key: Option<&str>,
        lifecycle: Lifecycle,
        cast: fn(Arc<I>) -> Arc<V>,
    ) -> Self
    where
        I: Send + Sync + 'static,
    {
        Self::from_inner(Some(TypeRef::of::<V>()), key.map(Arc::from))
            .with_lifecycle(lifecycle)
            .auto_create(cast)
    }

    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.inner.key = Some(key.into());
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.inner.lifecycle = lifecycle;
        self
    }

    /// Marks this identity as a prototype: never cached.
    pub fn prototype(self) -> Self {
        self.with_lifecycle(Lifecycle::Prototype)
    }

    /// Sets the implementation type to construct when no producer exists.
    pub fn auto_create<I>(mut self, cast: fn(Arc<I>) -> Arc<V>) -> Self
    where
        I: Send + Sync + 'static,
    {
        self.inner.auto_create = Some(AutoCreate::new(cast));
        self
    }

    /// The `(type, key)` view of this identity.
    pub fn resolvable(&self) -> ResolvableIdentity<V> {
        ResolvableIdentity {
            type_ref: self.inner.type_ref,
            key: self.inner.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V: ?Sized> Identity<V> {
    #[inline]
    pub fn erased(&self) -> &AnyIdentity {
        &self.inner
    }

    #[inline]
    pub fn into_erased(self) -> AnyIdentity {
        self.inner
    }

    #[inline]
    pub fn key(&self) -> Option<&str> {
        self.inner.key()
    }

    #[inline]
    pub fn type_ref(&self) -> Option<TypeRef> {
        self.inner.type_ref
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle
    }

    #[inline]
    pub fn is_prototype(&self) -> bool {
        self.inner.is_prototype()
    }

    #[inline]
    pub fn auto_create_target(&self) -> Option<TypeRef> {
        self.inner.auto_create.as_ref().map(AutoCreate::target)
    }
}

impl<V: ?Sized> Clone for Identity<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V: ?Sized> PartialEq for Identity<V> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<V: ?Sized> Eq for Identity<V> {}

impl<V: ?Sized> Hash for Identity<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<V: ?Sized> fmt::Debug for Identity<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl<V: ?Sized> fmt::Display for Identity<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

/// The `(type, key)` pair alone, for callers that only resolve.
///
/// Converts into an [`Identity`] with default lifecycle and no
/// auto-create target.
pub struct ResolvableIdentity<V: ?Sized> {
    type_ref: Option<TypeRef>,
    key: Option<Arc<str>>,
    _marker: PhantomData<fn() -> Box<V>>,
}

impl<V: ?Sized + Send + Sync + 'static> ResolvableIdentity<V> {
    pub fn of() -> Self {
        Self {
            type_ref: Some(TypeRef::of::<V>()),
            key: None,
            _marker: PhantomData,
        }
    }

    pub fn named(key: impl Into<Arc<str>>) -> Self {
        Self {
            type_ref: Some(TypeRef::of::<V>()),
            key: Some(key.into()),
            _marker: PhantomData,
        }
    }

    pub fn keyed(key: impl Into<Arc<str>>) -> Self {
        Self {
            type_ref: None,
            key: Some(key.into()),
            _marker: PhantomData,
        }
    }

    pub fn into_identity(self) -> Identity<V> {
        Identity::from_inner(self.type_ref, self.key)
    }
}

impl<V: ?Sized> Clone for ResolvableIdentity<V> {
    fn clone(&self) -> Self {
        Self {
            type_ref: self.type_ref,
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V: ?Sized> fmt::Debug for ResolvableIdentity<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvableIdentity")
            .field("type", &self.type_ref.map(|t| t.name))
            .field("key", &self.key)
            .finish()
    }
}

impl<V: ?Sized + Send + Sync + 'static> From<ResolvableIdentity<V>> for Identity<V> {
    fn from(identity: ResolvableIdentity<V>) -> Self {
        identity.into_identity()
    }
}
