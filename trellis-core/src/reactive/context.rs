//! Active Effect Stack
//!
//! The stack records which tracked computation is currently running. When a
//! wrapped property is read, the runtime subscribes the computation on top
//! of the stack.
//!
//! # Implementation
//!
//! The stack is owned by a [`Runtime`](super::Runtime) rather than living in
//! a thread-local, so two runtimes never observe each other's computations.
//! Entering a run pushes and returns a guard; dropping the guard pops. This
//! keeps nested runs balanced on every exit path, including a panic inside
//! the user's function.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{EffectId, Subscriber};

/// Stack of running computations, innermost last.
#[derive(Default)]
pub(crate) struct ActiveStack {
    stack: RefCell<Vec<Rc<dyn Subscriber>>>,
}

impl ActiveStack {
    /// The innermost running computation, if any.
    pub(crate) fn current(&self) -> Option<Rc<dyn Subscriber>> {
        self.stack.borrow().last().cloned()
    }

    pub(crate) fn current_id(&self) -> Option<EffectId> {
        self.stack.borrow().last().map(|effect| effect.id())
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Push `effect` and return a guard that pops it again.
    pub(crate) fn enter(&self, effect: Rc<dyn Subscriber>) -> ActiveEffectGuard<'_> {
        let id = effect.id();
        self.stack.borrow_mut().push(effect);
        ActiveEffectGuard { stack: self, id }
    }
}

/// Guard that pops the active effect when dropped.
pub(crate) struct ActiveEffectGuard<'a> {
    stack: &'a ActiveStack,
    id: EffectId,
}

impl Drop for ActiveEffectGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.stack.borrow_mut().pop();

        if let Some(effect) = popped {
            debug_assert_eq!(
                effect.id(),
                self.id,
                "active effect mismatch: expected {:?}, got {:?}",
                self.id,
                effect.id()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect::Scheduler;
    use crate::reactive::subscriber::DepKey;

    struct Probe(EffectId);

    impl Subscriber for Probe {
        fn id(&self) -> EffectId {
            self.0
        }

        fn is_active(&self) -> bool {
            true
        }

        fn scheduler(&self) -> Option<Scheduler> {
            None
        }

        fn add_dep(&self, _dep: DepKey) {}

        fn run_erased(self: Rc<Self>) {}

        fn stop(&self) {}
    }

    fn probe() -> Rc<dyn Subscriber> {
        Rc::new(Probe(EffectId::next()))
    }

    #[test]
    fn stack_tracks_current_effect() {
        let stack = ActiveStack::default();
        let effect = probe();
        let id = effect.id();

        assert!(stack.current().is_none());

        {
            let _guard = stack.enter(effect);
            assert_eq!(stack.current_id(), Some(id));
            assert_eq!(stack.depth(), 1);
        }

        assert!(stack.current_id().is_none());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn nested_runs_restore_outer_effect() {
        let stack = ActiveStack::default();
        let outer = probe();
        let inner = probe();
        let (outer_id, inner_id) = (outer.id(), inner.id());

        {
            let _outer = stack.enter(outer);
            assert_eq!(stack.current_id(), Some(outer_id));

            {
                let _inner = stack.enter(inner);
                assert_eq!(stack.current_id(), Some(inner_id));
            }

            assert_eq!(stack.current_id(), Some(outer_id));
        }

        assert!(stack.current_id().is_none());
    }

    #[test]
    fn guard_pops_on_panic() {
        let stack = ActiveStack::default();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = stack.enter(probe());
            panic!("render failed");
        }));

        assert!(result.is_err());
        assert_eq!(stack.depth(), 0);
    }
}
