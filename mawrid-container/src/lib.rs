//! Core runtime for Mawrid DI.

pub mod constructor;
pub mod error;
mod guard;
pub mod identity;
pub mod inject;
pub mod injector;
pub mod instance;
pub mod lifecycle;
pub mod map_store;
pub mod module;
pub mod resolvable;
pub mod settings;
pub mod store;
pub mod weak_store;

pub use constructor::{ConstructorEntry, ConstructorTable, Injectable};
pub use error::{MawridError, NotFoundReason, Result};
pub use identity::{AnyIdentity, Identity, ResolvableIdentity, TypeRef};
pub use inject::{Inject, InjectSafe};
pub use injector::{Injector, InjectorBuilder};
pub use instance::Instance;
pub use lifecycle::Lifecycle;
pub use module::Module;
pub use resolvable::{Registrar, RegistrarExt, Resolvable, ResolvableExt};
pub use settings::{InjectorSettings, StoreKind};
pub use store::{AliasStore, Store};

pub mod prelude {
    pub use crate::constructor::{ConstructorEntry, ConstructorTable, Injectable};
    pub use crate::error::{MawridError, Result};
    pub use crate::identity::{Identity, ResolvableIdentity};
    pub use crate::inject::{Inject, InjectSafe};
    pub use crate::injector::Injector;
    pub use crate::lifecycle::Lifecycle;
    pub use crate::module::Module;
    pub use crate::resolvable::{Registrar, RegistrarExt, Resolvable, ResolvableExt};
}

// Used by `#[derive(Injectable)]` expansions.
#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
