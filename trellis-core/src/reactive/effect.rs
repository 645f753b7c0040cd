//! Effect Implementation
//!
//! An effect is a tracked computation: a zero-argument function whose reads
//! of reactive properties become subscriptions.
//!
//! # How Effects Work
//!
//! 1. When registered, the effect runs once to establish its subscriptions.
//!
//! 2. Before every run, the effect leaves every Dep it joined last time. The
//!    run then rebuilds its membership from scratch, so a branch that is no
//!    longer taken stops delivering notifications.
//!
//! 3. When a subscribed property is written, the effect re-runs, or, if it
//!    was registered with a scheduler, the scheduler is handed an
//!    [`EffectHandle`] and decides when to run it.
//!
//! # Stopping
//!
//! [`stop`] removes the effect from every Dep and marks it inactive. The
//! runner still works afterwards, but runs the function untracked, so a
//! forced run does not bring automatic updates back.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use super::runtime::Runtime;
use super::subscriber::{DepKey, EffectId, Subscriber};

/// Callback substituted for direct re-execution when a dependency changes.
pub type Scheduler = Rc<dyn Fn(&EffectHandle)>;

/// Optional behaviour for [`Runtime::effect_with`].
#[derive(Default)]
pub struct EffectOptions {
    scheduler: Option<Scheduler>,
    on_stop: Option<Box<dyn FnOnce()>>,
}

impl EffectOptions {
    /// Options with no scheduler and no stop callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route trigger-driven runs through `scheduler`.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&EffectHandle) + 'static,
    {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Called once, the first time the effect is stopped.
    pub fn on_stop<F>(mut self, on_stop: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        self.on_stop = Some(Box::new(on_stop));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("scheduler", &self.scheduler.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

pub(crate) struct ReactiveEffect<T> {
    id: EffectId,
    runtime: Runtime,
    f: Box<dyn Fn() -> T>,

    /// Deps this effect currently belongs to.
    deps: RefCell<SmallVec<[DepKey; 4]>>,

    active: Cell<bool>,
    scheduler: Option<Scheduler>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    run_count: Cell<usize>,
}

impl<T: 'static> ReactiveEffect<T> {
    fn run(this: &Rc<Self>) -> T {
        this.run_count.set(this.run_count.get() + 1);

        if !this.active.get() {
            tracing::trace!(effect = ?this.id, "running stopped effect untracked");
            return (this.f)();
        }

        this.cleanup();
        tracing::trace!(effect = ?this.id, "run");

        let subscriber: Rc<dyn Subscriber> = Rc::clone(this) as Rc<dyn Subscriber>;
        let _guard = this.runtime.enter(subscriber);
        (this.f)()
    }

    /// Leave every Dep and forget the memberships.
    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        if !deps.is_empty() {
            self.runtime.unsubscribe(self.id, &deps);
        }
    }
}

impl<T: 'static> Subscriber for ReactiveEffect<T> {
    fn id(&self) -> EffectId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn scheduler(&self) -> Option<Scheduler> {
        self.scheduler.clone()
    }

    fn add_dep(&self, dep: DepKey) {
        self.deps.borrow_mut().push(dep);
    }

    fn run_erased(self: Rc<Self>) {
        let _ = ReactiveEffect::run(&self);
    }

    fn stop(&self) {
        if !self.active.get() {
            return;
        }

        self.cleanup();
        self.active.set(false);
        tracing::debug!(effect = ?self.id, "stopped");

        let on_stop = self.on_stop.borrow_mut().take();
        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }
}

/// Callable returned from registering an effect.
///
/// Each [`run`](Runner::run) re-executes the effect and returns what the
/// function returned. Clones share the same effect.
pub struct Runner<T> {
    effect: Rc<ReactiveEffect<T>>,
}

impl<T: 'static> Runner<T> {
    /// Re-execute the effect.
    pub fn run(&self) -> T {
        ReactiveEffect::run(&self.effect)
    }

    /// Deactivate the effect. Calling this more than once does nothing.
    pub fn stop(&self) {
        self.effect.stop();
    }

    /// Whether the effect still reacts to writes.
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// Identity shared with the [`EffectHandle`]s of this effect.
    pub fn id(&self) -> EffectId {
        self.effect.id
    }

    /// Number of times the function has executed, including the initial run.
    pub fn run_count(&self) -> usize {
        self.effect.run_count.get()
    }

    /// Number of Deps the effect currently belongs to.
    pub fn dep_count(&self) -> usize {
        self.effect.deps.borrow().len()
    }

    /// Type-erased handle to the same effect.
    pub fn handle(&self) -> EffectHandle {
        EffectHandle::new(Rc::clone(&self.effect) as Rc<dyn Subscriber>)
    }
}

impl<T> Clone for Runner<T> {
    fn clone(&self) -> Self {
        Self {
            effect: Rc::clone(&self.effect),
        }
    }
}

impl<T> fmt::Debug for Runner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("id", &self.effect.id)
            .field("active", &self.effect.active.get())
            .field("run_count", &self.effect.run_count.get())
            .field("dep_count", &self.effect.deps.borrow().len())
            .finish()
    }
}

/// Deactivate the effect behind `runner`.
///
/// Idempotent: only the first call removes subscriptions and fires
/// `on_stop`.
pub fn stop<T: 'static>(runner: &Runner<T>) {
    runner.stop();
}

/// Type-erased, clonable handle to an effect.
///
/// Schedulers receive one of these and may keep it to run the effect later.
#[derive(Clone)]
pub struct EffectHandle {
    effect: Rc<dyn Subscriber>,
}

impl EffectHandle {
    pub(crate) fn new(effect: Rc<dyn Subscriber>) -> Self {
        Self { effect }
    }

    /// Identity of the effect behind this handle.
    pub fn id(&self) -> EffectId {
        self.effect.id()
    }

    /// Re-execute the effect, discarding its result.
    pub fn run(&self) {
        Rc::clone(&self.effect).run_erased();
    }

    /// Whether the effect still reacts to writes.
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// Deactivate the effect, like [`stop`].
    pub fn stop(&self) {
        self.effect.stop();
    }
}

impl fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHandle")
            .field("id", &self.effect.id())
            .field("active", &self.effect.is_active())
            .finish()
    }
}

impl Runtime {
    /// Register `f` as an effect and run it once.
    pub fn effect<T, F>(&self, f: F) -> Runner<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        self.effect_with(f, EffectOptions::default())
    }

    /// Register `f` as an effect with options and run it once.
    pub fn effect_with<T, F>(&self, f: F, options: EffectOptions) -> Runner<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        let (runner, _) = self.create_effect(f, options);
        runner
    }

    /// Like [`effect_with`](Self::effect_with), but also hands back the
    /// result of the initial run.
    pub(crate) fn create_effect<T, F>(&self, f: F, options: EffectOptions) -> (Runner<T>, T)
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        let effect = Rc::new(ReactiveEffect {
            id: EffectId::next(),
            runtime: self.clone(),
            f: Box::new(f),
            deps: RefCell::new(SmallVec::new()),
            active: Cell::new(true),
            scheduler: options.scheduler,
            on_stop: RefCell::new(options.on_stop),
            run_count: Cell::new(0),
        });
        tracing::debug!(effect = ?effect.id, scheduled = effect.scheduler.is_some(), "registered effect");

        let first = ReactiveEffect::run(&effect);
        (Runner { effect }, first)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
