//! Type-erased shared values.
//!
//! Stores keep produced values as [`Instance`]s: an `Arc<V>` with its
//! type tag, where `V` may be a trait object. Keeping the `Arc` itself
//! (instead of a clone of `V`) is what lets the weak store hold a
//! [`WeakInstance`] that dies with the last outside owner.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::identity::TypeRef;

trait ErasedArc: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn clone_arc(&self) -> Box<dyn ErasedArc>;
    fn downgrade(&self) -> Box<dyn ErasedWeak>;
    fn strong_count(&self) -> usize;
}

impl<V: ?Sized + Send + Sync + 'static> ErasedArc for Arc<V> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_arc(&self) -> Box<dyn ErasedArc> {
        Box::new(Arc::clone(self))
    }

    fn downgrade(&self) -> Box<dyn ErasedWeak> {
        Box::new(Arc::downgrade(self))
    }

    fn strong_count(&self) -> usize {
        Arc::strong_count(self)
    }
}

trait ErasedWeak: Send + Sync {
    fn upgrade(&self) -> Option<Box<dyn ErasedArc>>;
    fn is_alive(&self) -> bool;
}

impl<V: ?Sized + Send + Sync + 'static> ErasedWeak for Weak<V> {
    fn upgrade(&self) -> Option<Box<dyn ErasedArc>> {
        Weak::upgrade(self).map(|value| Box::new(value) as Box<dyn ErasedArc>)
    }

    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

/// A shared value of some type `V`, with `V` erased.
pub struct Instance {
    value_type: TypeRef,
    value: Box<dyn ErasedArc>,
}

impl Instance {
    /// Wraps an existing `Arc<V>`. The instance shares its allocation.
    pub fn new<V: ?Sized + Send + Sync + 'static>(value: Arc<V>) -> Self {
        Self {
            value_type: TypeRef::of::<V>(),
            value: Box::new(value),
        }
    }

    pub fn from_value<V: Send + Sync + 'static>(value: V) -> Self {
        Self::new(Arc::new(value))
    }

    /// The `V` this instance was created from.
    #[inline]
    pub fn value_type(&self) -> TypeRef {
        self.value_type
    }

    #[inline]
    pub fn is<V: ?Sized + 'static>(&self) -> bool {
        self.value_type == TypeRef::of::<V>()
    }

    /// Returns the shared value if it is a `V`.
    pub fn downcast<V: ?Sized + 'static>(&self) -> Option<Arc<V>> {
        self.value.as_any().downcast_ref::<Arc<V>>().cloned()
    }

    /// Number of strong owners of the underlying value, this one included.
    pub fn strong_count(&self) -> usize {
        self.value.strong_count()
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance {
            value_type: self.value_type,
            value: self.value.downgrade(),
        }
    }
}

impl Clone for Instance {
    fn clone(&self) -> Self {
        Self {
            value_type: self.value_type,
            value: self.value.clone_arc(),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.value_type.name())
    }
}

/// A non-owning handle to an [`Instance`].
pub struct WeakInstance {
    value_type: TypeRef,
    value: Box<dyn ErasedWeak>,
}

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.value.upgrade().map(|value| Instance {
            value_type: self.value_type,
            value,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.value.is_alive()
    }

    #[inline]
    pub fn value_type(&self) -> TypeRef {
        self.value_type
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WeakInstance({}, alive={})",
            self.value_type.name(),
            self.is_alive()
        )
    }
}
