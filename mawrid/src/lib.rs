//! # Mawrid: dependency injection runtime for Rust
//!
//! Register values, producers and aliases on an [`Injector`], then
//! resolve them by [`Identity`]. Types that derive [`Injectable`] can be
//! resolved without any registration at all.
//!
//! ```rust
//! use mawrid::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! struct Greeter {
//!     #[mawrid(key = "name")]
//!     name: Arc<String>,
//! }
//!
//! let injector = Injector::new();
//! injector.register_value(&Identity::<String>::named("name"), Arc::new("world".into()));
//!
//! let greeter = injector.resolve(&Identity::<Greeter>::of()).expect("Failed to resolve");
//! assert_eq!(*greeter.name, "world");
//! ```

pub use mawrid_container::*;
pub use mawrid_macros::Injectable;
pub use mawrid_support::*;

pub mod prelude {
    pub use mawrid_container::prelude::*;
    pub use mawrid_macros::Injectable;
}
