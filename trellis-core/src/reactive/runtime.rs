//! Reactive Runtime
//!
//! The runtime is the explicit context that connects wrapped records and
//! tracked computations. It owns:
//!
//! - the dependency registry, mapping `(target, property)` to a Dep;
//! - the wrapper cache, so a record is wrapped at most once;
//! - the stack of currently running computations.
//!
//! # How It Works
//!
//! 1. An effect runs inside [`ActiveStack::enter`], which makes it the
//!    current computation.
//!
//! 2. Every tracked read calls [`Runtime::track`], which adds the current
//!    computation to the Dep for that property and records the Dep on the
//!    computation, so the link can be undone later.
//!
//! 3. A write calls [`Runtime::trigger`], which snapshots the Dep and either
//!    hands each computation to its scheduler or re-runs it directly.
//!
//! # Threading
//!
//! The runtime is single threaded. A [`Runtime`] is a cheap `Rc` handle;
//! clones share the same registry. Every borrow of the registry is released
//! before user code runs, so effects may freely read and write reactive
//! state while they execute.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::context::{ActiveEffectGuard, ActiveStack};
use super::effect::EffectHandle;
use super::subscriber::{DepKey, EffectId, Subscriber, TargetId};
use super::wrapper::{Reactive, ReactiveInner, Record};
use crate::config::RuntimeConfig;

/// Subscribers of one `(target, property)` pair, in subscription order.
pub(crate) type Dep = IndexMap<EffectId, Rc<dyn Subscriber>>;

struct RuntimeInner {
    config: RuntimeConfig,

    /// `target -> property -> Dep`.
    deps: RefCell<IndexMap<TargetId, IndexMap<Rc<str>, Dep>>>,

    /// Wrapped records, keyed by record address. Entries are weak so the
    /// cache never keeps a wrapper alive.
    wrappers: RefCell<HashMap<usize, Weak<ReactiveInner>>>,

    active: ActiveStack,

    /// Number of trigger passes currently on the call stack.
    trigger_depth: Cell<usize>,
}

/// Handle to a reactive runtime.
///
/// Cloning is cheap and yields a handle to the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                deps: RefCell::new(IndexMap::new()),
                wrappers: RefCell::new(HashMap::new()),
                active: ActiveStack::default(),
                trigger_depth: Cell::new(0),
            }),
        }
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Wrap a shared record.
    ///
    /// Wrapping the same record again returns a handle to the existing
    /// wrapper; see [`Reactive::ptr_eq`].
    pub fn reactive(&self, target: &Rc<RefCell<Record>>) -> Reactive {
        let address = Rc::as_ptr(target) as usize;

        // Upgraded outside the borrow: dropping a wrapper re-enters the cache.
        let existing = self.inner.wrappers.borrow().get(&address).and_then(Weak::upgrade);
        if let Some(existing) = existing {
            if Rc::ptr_eq(&existing.target, target) {
                return Reactive::from_inner(existing);
            }
        }

        let reactive = Reactive::new(TargetId::next(), Rc::clone(target), self.clone());
        tracing::trace!(target_id = ?reactive.id(), "wrapped record");
        self.inner.wrappers.borrow_mut().insert(address, reactive.downgrade());
        reactive
    }

    /// Wrap a fresh record.
    pub fn reactive_from(&self, record: Record) -> Reactive {
        self.reactive(&Rc::new(RefCell::new(record)))
    }

    /// Subscribe the running computation to `(target, key)`.
    ///
    /// Does nothing when no computation is running, or when the running one
    /// was stopped partway through its run. Tracking the same computation
    /// against the same Dep twice is a no-op.
    pub fn track(&self, target: TargetId, key: &str) {
        let Some(effect) = self.inner.active.current() else {
            return;
        };
        if !effect.is_active() {
            return;
        }
        let id = effect.id();

        let key = {
            let mut registry = self.inner.deps.borrow_mut();
            let keys = registry.entry(target).or_default();

            match keys.get_full_mut(key) {
                Some((_, name, dep)) => {
                    if dep.contains_key(&id) {
                        return;
                    }
                    dep.insert(id, Rc::clone(&effect));
                    Rc::clone(name)
                }
                None => {
                    let name: Rc<str> = Rc::from(key);
                    let mut dep = Dep::default();
                    dep.insert(id, Rc::clone(&effect));
                    keys.insert(Rc::clone(&name), dep);
                    name
                }
            }
        };

        tracing::trace!(effect = ?id, target_id = ?target, key = %key, "track");
        effect.add_dep(DepKey { target, key });
    }

    /// Notify every subscriber of `(target, key)`.
    ///
    /// The Dep is snapshotted first, so computations that join it during this
    /// pass are not notified by it. The computation that is currently running
    /// is skipped, as is any computation stopped earlier in the pass.
    pub fn trigger(&self, target: TargetId, key: &str) {
        let effects: Vec<Rc<dyn Subscriber>> = {
            let registry = self.inner.deps.borrow();
            match registry.get(&target).and_then(|keys| keys.get(key)) {
                Some(dep) => dep.values().cloned().collect(),
                None => return,
            }
        };

        let depth = self.inner.trigger_depth.get();
        if depth >= self.inner.config.max_trigger_depth {
            tracing::warn!(
                target_id = ?target,
                key,
                depth,
                "trigger chain exceeded max_trigger_depth; dropping notification"
            );
            return;
        }
        let _depth = TriggerDepth::enter(&self.inner.trigger_depth);

        tracing::debug!(target_id = ?target, key, subscribers = effects.len(), "trigger");

        let running = self.inner.active.current_id();
        for effect in effects {
            if !effect.is_active() || Some(effect.id()) == running {
                continue;
            }

            match effect.scheduler() {
                Some(scheduler) => scheduler(&EffectHandle::new(effect)),
                None => effect.run_erased(),
            }
        }
    }

    /// Remove `effect` from each of the given Deps.
    ///
    /// A Dep left empty is dropped, and so is a target with no Deps left.
    pub(crate) fn unsubscribe(&self, effect: EffectId, deps: &[DepKey]) {
        let removed: Vec<Rc<dyn Subscriber>> = {
            let mut registry = self.inner.deps.borrow_mut();
            let mut removed = Vec::with_capacity(deps.len());

            for dep_key in deps {
                let Some(keys) = registry.get_mut(&dep_key.target) else {
                    continue;
                };
                if let Some(dep) = keys.get_mut(&*dep_key.key) {
                    removed.extend(dep.shift_remove(&effect));
                    if dep.is_empty() {
                        keys.shift_remove(&*dep_key.key);
                    }
                }
                if keys.is_empty() {
                    registry.shift_remove(&dep_key.target);
                }
            }

            removed
        };

        // Dropped here, outside the registry borrow.
        drop(removed);
    }

    /// Forget the cache entry for a record whose wrapper was dropped.
    ///
    /// Called from the wrapper's destructor. An entry that has since been
    /// replaced by a live wrapper is left alone.
    pub(crate) fn forget_wrapper(&self, address: usize) {
        let Ok(mut wrappers) = self.inner.wrappers.try_borrow_mut() else {
            return;
        };
        if wrappers.get(&address).is_some_and(|weak| weak.strong_count() == 0) {
            wrappers.remove(&address);
        }
    }

    /// Number of records with a live wrapper in the cache.
    pub fn wrapper_count(&self) -> usize {
        self.inner.wrappers.borrow().len()
    }

    /// Make `effect` the running computation until the guard drops.
    pub(crate) fn enter(&self, effect: Rc<dyn Subscriber>) -> ActiveEffectGuard<'_> {
        self.inner.active.enter(effect)
    }

    /// ID of the innermost running computation.
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.active.current_id()
    }

    /// Whether a computation is currently running.
    pub fn is_tracking(&self) -> bool {
        self.inner.active.depth() > 0
    }

    /// Number of subscribers in the Dep for `(target, key)`, or `None` when
    /// nothing is subscribed to that pair.
    pub fn dep_len(&self, target: TargetId, key: &str) -> Option<usize> {
        self.inner
            .deps
            .borrow()
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map(|dep| dep.len())
    }

    /// Number of records that currently have at least one subscribed Dep.
    pub fn target_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// Whether two handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("targets", &self.inner.deps.borrow().len())
            .field("active_depth", &self.inner.active.depth())
            .finish()
    }
}

/// Increments the trigger depth for the lifetime of one trigger pass.
struct TriggerDepth<'a>(&'a Cell<usize>);

impl<'a> TriggerDepth<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for TriggerDepth<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
