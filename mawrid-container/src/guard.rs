//! Cycle detection for runtime resolution.
//!
//! Each thread keeps a stack of the identities it is currently
//! producing. Entering an identity that is already on the stack (for the
//! same injector) means some producer asked, directly or through other
//! producers, for the value it is building.
//!
//! The guard is entered before any production lock is taken, so a
//! same-thread cycle fails fast instead of deadlocking.
//!
//! Cycles that span threads show up as production locks waiting on each
//! other. [`WaitGraph`] records which thread holds each lock and which
//! lock each blocked thread wants, and refuses to block when following
//! those edges leads back to the caller.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tracing::{trace, warn};

use crate::error::{CircularDependencyError, MawridError, Result};
use crate::identity::{AnyIdentity, IdentityKey};

struct Frame {
    injector: u64,
    key: IdentityKey,
    label: String,
}

thread_local! {
    static IN_FLIGHT: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Marks an identity as in production on the current thread until dropped.
///
/// Guards must be dropped in reverse order of creation, which scoping
/// gives for free. Not `Send`: the frame belongs to this thread's stack.
pub(crate) struct ResolutionGuard {
    _not_send: PhantomData<*const ()>,
}

impl ResolutionGuard {
    /// Pushes `identity`, or fails with the cycle if it is already in flight.
    pub(crate) fn enter(injector: u64, identity: &AnyIdentity) -> Result<Self> {
        let key = identity.identity_key();
        IN_FLIGHT.with(|stack| {
            let mut stack = stack.borrow_mut();

            let open = stack
                .iter()
                .position(|frame| frame.injector == injector && frame.key == key);
            if let Some(start) = open {
                let mut chain: Vec<String> = stack[start..]
                    .iter()
                    .filter(|frame| frame.injector == injector)
                    .map(|frame| frame.label.clone())
                    .collect();
                chain.push(identity.to_string());

                warn!(cycle = ?chain, "Circular dependency detected");
                return Err(MawridError::CircularDependency(CircularDependencyError {
                    chain,
                }));
            }

            stack.push(Frame {
                injector,
                key,
                label: identity.to_string(),
            });
            Ok(ResolutionGuard {
                _not_send: PhantomData,
            })
        })
    }

    /// Number of identities in production on this thread.
    #[cfg(test)]
    pub(crate) fn depth() -> usize {
        IN_FLIGHT.with(|stack| stack.borrow().len())
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        IN_FLIGHT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

// ============================================================
// Cross-thread waits
// ============================================================

/// Lock owners and blocked threads of one injector.
#[derive(Default)]
pub(crate) struct WaitGraph {
    owners: DashMap<IdentityKey, ThreadId>,
    waiting: DashMap<ThreadId, (IdentityKey, String)>,
}

impl WaitGraph {
    /// Takes `lock` for `identity`, or fails if waiting for it would
    /// close a cycle through other threads.
    pub(crate) fn acquire<'a>(
        &'a self,
        lock: &'a Mutex<()>,
        identity: &AnyIdentity,
    ) -> Result<HeldLock<'a>> {
        let key = identity.identity_key();
        let me = thread::current().id();

        let guard = match lock.try_lock() {
            Some(guard) => guard,
            None => {
                self.waiting
                    .insert(me, (key.clone(), identity.to_string()));
                if let Some(chain) = self.cycle_from(me, &key, identity.to_string()) {
                    self.waiting.remove(&me);
                    warn!(cycle = ?chain, "Circular dependency across threads");
                    return Err(MawridError::CircularDependency(CircularDependencyError {
                        chain,
                    }));
                }
                trace!(identity = %identity, "Waiting for production lock");
                let guard = lock.lock();
                self.waiting.remove(&me);
                guard
            }
        };

        self.owners.insert(key.clone(), me);
        Ok(HeldLock {
            graph: self,
            key,
            _guard: guard,
        })
    }

    /// Follows owner and waits-for edges from `key`. Returns the chain if
    /// they lead back to `me`.
    fn cycle_from(&self, me: ThreadId, key: &IdentityKey, label: String) -> Option<Vec<String>> {
        let mut chain = vec![label];
        let mut key = key.clone();
        // each step visits a distinct blocked thread
        for _ in 0..=self.waiting.len() {
            let owner = *self.owners.get(&key)?.value();
            if owner == me {
                let closing = chain.last().cloned().unwrap_or_default();
                chain.insert(0, closing);
                return Some(chain);
            }
            let (next, label) = self.waiting.get(&owner)?.value().clone();
            chain.push(label);
            key = next;
        }
        None
    }
}

/// A held production lock. Clears the owner entry before unlocking.
pub(crate) struct HeldLock<'a> {
    graph: &'a WaitGraph,
    key: IdentityKey,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for HeldLock<'_> {
    fn drop(&mut self) {
        self.graph.owners.remove(&self.key);
    }
}
