//! Injector configuration.
//!
//! Settings are plain serde data, so they can live in whatever config
//! file the application already loads:
//!
//! ```
//! use mawrid_container::settings::{InjectorSettings, StoreKind};
//!
//! let settings: InjectorSettings = serde_json::from_str(r#"{ "store": "weak" }"#).unwrap();
//! assert_eq!(settings.store, StoreKind::Weak);
//! assert!(settings.auto_construct);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::map_store::MapStore;
use crate::store::Store;
use crate::weak_store::WeakStore;

/// Which store strategy an injector builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Cached values live as long as the injector.
    #[default]
    Map,
    /// Cached values live as long as someone outside holds them.
    Weak,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Map => write!(f, "map"),
            StoreKind::Weak => write!(f, "weak"),
        }
    }
}

/// Knobs for [`Injector`](crate::injector::Injector).
///
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorSettings {
    pub store: StoreKind,
    /// Weak store only: hold cached values strongly after all.
    pub strong_references: bool,
    /// Build unregistered types from the constructor table.
    pub auto_construct: bool,
    /// Consult constructors submitted at link time.
    pub use_linked_constructors: bool,
}

impl Default for InjectorSettings {
    fn default() -> Self {
        Self {
            store: StoreKind::Map,
            strong_references: false,
            auto_construct: true,
            use_linked_constructors: true,
        }
    }
}

impl InjectorSettings {
    /// A fresh, empty store of the configured kind.
    pub fn build_store(&self) -> Arc<dyn Store> {
        match self.store {
            StoreKind::Map => Arc::new(MapStore::new()),
            StoreKind::Weak => Arc::new(WeakStore::with_strong_references(self.strong_references)),
        }
    }
}
