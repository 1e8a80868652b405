//! Dependency lifecycles.
//!
//! A lifecycle decides whether a produced value is kept:
//! - [`Lifecycle::Singleton`]: produced once, cached, reused
//! - [`Lifecycle::Prototype`]: produced on every resolve, never cached
use std::fmt;

/// Defines how long a resolved dependency lives.
///
/// # Examples
/// ```
/// use mawrid_container::lifecycle::Lifecycle;
///
/// assert!(Lifecycle::Singleton.is_cached());
/// assert!(Lifecycle::Prototype.is_prototype());
/// assert_eq!(Lifecycle::default(), Lifecycle::Singleton);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// The first produced value is cached in the store and handed out
    /// to every later resolve.
    ///
    /// With a weak store the cached value may be dropped once nobody
    /// else holds it, in which case the next resolve produces again.
    #[default]
    Singleton,

    /// A fresh value on every resolve. The store never sees it.
    Prototype,
}

impl Lifecycle {
    /// Picks the prototype lifecycle if either side asks for it.
    #[inline]
    pub fn merge(self, other: Lifecycle) -> Lifecycle {
        if self.is_prototype() || other.is_prototype() {
            Lifecycle::Prototype
        } else {
            Lifecycle::Singleton
        }
    }

    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifecycle::Singleton)
    }

    #[inline]
    pub fn is_prototype(&self) -> bool {
        matches!(self, Lifecycle::Prototype)
    }
}

impl From<bool> for Lifecycle {
    /// `true` means prototype.
    fn from(is_prototype: bool) -> Self {
        if is_prototype {
            Lifecycle::Prototype
        } else {
            Lifecycle::Singleton
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Singleton => write!(f, "Singleton"),
            Lifecycle::Prototype => write!(f, "Prototype"),
        }
    }
}
