//! Constructor table: how the engine builds types nobody registered.
//!
//! When an identity has no producer, the engine looks its type (or its
//! auto-create target) up here. An entry can offer two constructors:
//! - a resolver-aware one ([`Injectable::inject`]) that resolves its own
//!   dependencies, preferred when present
//! - a no-argument one ([`Default`])
//!
//! Entries come from two places: a [`ConstructorTable`] filled at startup,
//! and entries submitted at link time through `inventory` (which is what
//! `#[derive(Injectable)]` emits).
//!
//! # Examples
//! ```
//! use mawrid_container::constructor::{ConstructorEntry, ConstructorTable};
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! let table = ConstructorTable::new().with(ConstructorEntry::default_of::<Clock>());
//! assert!(table.contains::<Clock>());
//! ```

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::Result;
use crate::identity::TypeRef;
use crate::instance::Instance;
use crate::resolvable::Resolvable;

/// A type that builds itself from a resolver.
///
/// Usually derived:
/// ```rust,ignore
/// #[derive(Injectable)]
/// struct Mailer {
///     smtp: Arc<SmtpClient>,
///     #[mawrid(key = "from")]
///     sender: Arc<String>,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    fn inject(resolver: &dyn Resolvable) -> Result<Self>;
}

type InjectFn = fn(&dyn Resolvable) -> Result<Instance>;
type DefaultFn = fn() -> Instance;

fn inject_erased<T: Injectable>(resolver: &dyn Resolvable) -> Result<Instance> {
    T::inject(resolver).map(Instance::from_value)
}

fn default_erased<T: Default + Send + Sync + 'static>() -> Instance {
    Instance::from_value(T::default())
}

/// How to build one type.
///
/// All constructors are `const`, so entries can be submitted with
/// `inventory::submit!`.
#[derive(Clone, Copy)]
pub struct ConstructorEntry {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    with_resolver: Option<InjectFn>,
    no_arg: Option<DefaultFn>,
}

impl ConstructorEntry {
    /// Builds `T` through [`Injectable::inject`].
    pub const fn injectable<T: Injectable>() -> Self {
        Self {
            type_id: TypeId::of::<T>,
            type_name: type_name::<T>,
            with_resolver: Some(inject_erased::<T>),
            no_arg: None,
        }
    }

    /// Builds `T` through [`Default`].
    pub const fn default_of<T: Default + Send + Sync + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>,
            type_name: type_name::<T>,
            with_resolver: None,
            no_arg: Some(default_erased::<T>),
        }
    }

    /// Offers both constructors; `inject` is tried first.
    pub const fn both<T: Injectable + Default>() -> Self {
        Self {
            type_id: TypeId::of::<T>,
            type_name: type_name::<T>,
            with_resolver: Some(inject_erased::<T>),
            no_arg: Some(default_erased::<T>),
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::from_parts((self.type_id)(), (self.type_name)())
    }

    pub fn has_resolver_constructor(&self) -> bool {
        self.with_resolver.is_some()
    }

    pub fn has_default_constructor(&self) -> bool {
        self.no_arg.is_some()
    }

    /// Runs the preferred constructor.
    ///
    /// Returns `None` when the entry has no constructor at all.
    pub fn construct(&self, resolver: &dyn Resolvable) -> Option<Result<Instance>> {
        if let Some(inject) = self.with_resolver {
            return Some(inject(resolver));
        }
        self.no_arg.map(|build| Ok(build()))
    }

    /// Fills constructors `self` lacks from `other`.
    fn merge(self, other: ConstructorEntry) -> Self {
        Self {
            type_id: self.type_id,
            type_name: self.type_name,
            with_resolver: other.with_resolver.or(self.with_resolver),
            no_arg: other.no_arg.or(self.no_arg),
        }
    }
}

impl fmt::Debug for ConstructorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorEntry")
            .field("type", &(self.type_name)())
            .field("with_resolver", &self.with_resolver.is_some())
            .field("no_arg", &self.no_arg.is_some())
            .finish()
    }
}

inventory::collect!(ConstructorEntry);

static LINKED: Lazy<ConstructorTable> = Lazy::new(|| {
    let mut table = ConstructorTable::new();
    for entry in inventory::iter::<ConstructorEntry>() {
        table.register(*entry);
    }
    debug!(entries = table.len(), "Collected linked constructors");
    table
});

/// Constructors keyed by [`TypeId`], also reachable by type name.
#[derive(Clone, Default)]
pub struct ConstructorTable {
    by_type: HashMap<TypeId, ConstructorEntry>,
    by_name: HashMap<&'static str, TypeId>,
}

impl ConstructorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry submitted with `inventory::submit!` in the final binary.
    pub fn linked() -> &'static ConstructorTable {
        &LINKED
    }

    /// Adds an entry. A second entry for the same type adds the
    /// constructors it offers and replaces the ones both offer.
    pub fn register(&mut self, entry: ConstructorEntry) -> &mut Self {
        let type_ref = entry.type_ref();
        let merged = match self.by_type.get(&type_ref.id()) {
            Some(existing) => existing.merge(entry),
            None => entry,
        };
        self.by_type.insert(type_ref.id(), merged);
        self.by_name.insert(type_ref.name(), type_ref.id());
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, entry: ConstructorEntry) -> Self {
        self.register(entry);
        self
    }

    pub fn register_injectable<T: Injectable>(&mut self) -> &mut Self {
        self.register(ConstructorEntry::injectable::<T>())
    }

    pub fn register_default<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.register(ConstructorEntry::default_of::<T>())
    }

    pub fn get(&self, type_id: TypeId) -> Option<&ConstructorEntry> {
        self.by_type.get(&type_id)
    }

    /// Looks an entry up by its `std::any::type_name`.
    pub fn find_by_name(&self, name: &str) -> Option<&ConstructorEntry> {
        self.by_name.get(name).and_then(|id| self.by_type.get(id))
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for ConstructorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorTable")
            .field("entries", &self.by_type.len())
            .finish()
    }
}
