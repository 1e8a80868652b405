//! Module trait: a group of related registrations.
//!
//! # Examples
//! ```rust,ignore
//! struct StorageModule;
//!
//! impl Module for StorageModule {
//!     fn register(&self, registrar: &dyn Registrar) {
//!         registrar.register_value(&Identity::<String>::named("db_url"), Arc::new(url()));
//!         registrar.register(&Identity::<Database>::of(), |r| {
//!             let url = r.resolve(&Identity::<String>::named("db_url"))?;
//!             Ok(Arc::new(Database::connect(&url)))
//!         });
//!         registrar.register_alias(&Identity::<Database>::named("primary"), &Identity::<Database>::of());
//!     }
//! }
//!
//! injector.install(&StorageModule);
//! ```

use crate::resolvable::Registrar;

/// A set of registrations installed together.
///
/// Modules only register; nothing is resolved while installing. Split
/// registrations by concern and install each module on the injector.
pub trait Module: Send + Sync {
    /// Registers this module's dependencies.
    fn register(&self, registrar: &dyn Registrar);

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
