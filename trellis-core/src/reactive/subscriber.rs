//! Identifiers and the subscriber interface for the reactive system.
//!
//! A subscriber is any tracked computation that can sit in a Dep. The
//! registry only sees subscribers through the object-safe [`Subscriber`]
//! trait, so effects returning different types can share one Dep.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::Scheduler;

/// Unique identifier for a tracked computation.
///
/// Each effect gets an ID when it is registered. Deps are keyed by this ID,
/// which is what keeps a computation from being subscribed twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Opaque identity assigned to a record when it is first wrapped.
///
/// The registry is keyed by `(TargetId, property)` instead of by the
/// record's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Address of one Dep in the registry.
///
/// Effects keep a list of these so they can remove themselves from every
/// Dep they joined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DepKey {
    pub(crate) target: TargetId,
    pub(crate) key: Rc<str>,
}

/// A tracked computation as seen by the dependency registry.
pub(crate) trait Subscriber {
    fn id(&self) -> EffectId;

    fn is_active(&self) -> bool;

    fn scheduler(&self) -> Option<Scheduler>;

    /// Record that this computation is now a member of `dep`.
    fn add_dep(&self, dep: DepKey);

    /// Re-execute the computation, dropping whatever it returns.
    fn run_erased(self: Rc<Self>);

    /// Permanently deactivate the computation.
    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_ids_are_unique() {
        let id1 = EffectId::next();
        let id2 = EffectId::next();
        let id3 = EffectId::next();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn target_ids_increase() {
        let first = TargetId::next();
        let second = TargetId::next();
        assert!(second.raw() > first.raw());
    }

    #[test]
    fn dep_keys_compare_by_content() {
        let target = TargetId::next();
        let a = DepKey { target, key: Rc::from("age") };
        let b = DepKey { target, key: Rc::from("age") };
        let c = DepKey { target, key: Rc::from("name") };

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
