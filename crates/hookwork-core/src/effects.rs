//! Effect slots and the two commit-time effect queues.
//!
//! Effects declared during a render are only queued once the render that
//! declared them has committed. The layout queue is drained before the commit
//! returns to the host; the passive queue waits for the host's idle point and
//! may therefore run after further renders of the same instance.

use crate::deps::{shallow_equal, Deps};
use crate::InstanceId;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EffectPhase {
    /// Runs synchronously right after the commit, before the host yields.
    Layout,
    /// Runs once the host hands control back at its idle point.
    Passive,
}

/// Value returned by an effect callback: an optional cleanup.
#[derive(Default)]
pub struct EffectCleanup {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl EffectCleanup {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    fn into_cleanup(self) -> Option<Box<dyn FnOnce()>> {
        self.cleanup
    }
}

impl From<()> for EffectCleanup {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

/// Persistent part of an effect slot.
pub(crate) struct EffectCell {
    phase: EffectPhase,
    /// Deps of the last committed render that scheduled this effect.
    deps: Option<Deps>,
    scheduled: bool,
    cleanup: Option<Box<dyn FnOnce()>>,
    disposed: bool,
}

impl EffectCell {
    pub(crate) fn new(phase: EffectPhase) -> Self {
        Self {
            phase,
            deps: None,
            scheduled: false,
            cleanup: None,
            disposed: false,
        }
    }

    fn should_run(&self, deps: Option<&Deps>) -> bool {
        !self.scheduled || !shallow_equal(self.deps.as_ref(), deps)
    }

    fn run_cleanup(cell: &Rc<RefCell<EffectCell>>) {
        let cleanup = cell.borrow_mut().cleanup.take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    /// Runs the last cleanup, once, and blocks any still-queued callback.
    pub(crate) fn dispose(cell: &Rc<RefCell<EffectCell>>) {
        if cell.borrow().disposed {
            return;
        }
        Self::run_cleanup(cell);
        cell.borrow_mut().disposed = true;
    }
}

/// An effect whose deps changed during a render, not yet committed.
pub(crate) struct PendingEffect {
    cell: Rc<RefCell<EffectCell>>,
    deps: Option<Deps>,
    callback: Box<dyn FnOnce() -> EffectCleanup>,
}

impl PendingEffect {
    /// Compares `deps` against the cell and returns the effect to schedule if
    /// they differ. The cell is left untouched until the render commits.
    pub(crate) fn diff(
        cell: &Rc<RefCell<EffectCell>>,
        deps: Option<Deps>,
        callback: Box<dyn FnOnce() -> EffectCleanup>,
    ) -> Option<Self> {
        if !cell.borrow().should_run(deps.as_ref()) {
            return None;
        }
        Some(Self {
            cell: Rc::clone(cell),
            deps,
            callback,
        })
    }

    /// Records the committed deps and hands back the queue entry.
    pub(crate) fn commit(self, instance: InstanceId) -> QueuedEffect {
        let phase = {
            let mut cell = self.cell.borrow_mut();
            cell.deps = self.deps;
            cell.scheduled = true;
            cell.phase
        };
        QueuedEffect {
            instance,
            phase,
            cell: self.cell,
            callback: self.callback,
        }
    }
}

pub(crate) struct QueuedEffect {
    instance: InstanceId,
    phase: EffectPhase,
    cell: Rc<RefCell<EffectCell>>,
    callback: Box<dyn FnOnce() -> EffectCleanup>,
}

impl QueuedEffect {
    pub(crate) fn phase(&self) -> EffectPhase {
        self.phase
    }

    /// Runs the previous cleanup, then the callback, keeping its new cleanup.
    /// Effects of disposed slots are dropped without running.
    fn run(self) {
        if self.cell.borrow().disposed {
            log::trace!("{}: skipping effect of unmounted slot", self.instance);
            return;
        }
        EffectCell::run_cleanup(&self.cell);
        let cleanup = (self.callback)().into_cleanup();
        let mut cell = self.cell.borrow_mut();
        if cell.disposed {
            drop(cell);
            if let Some(cleanup) = cleanup {
                cleanup();
            }
            return;
        }
        cell.cleanup = cleanup;
    }
}

/// Runs effects in queue order.
pub(crate) fn run_effects(effects: Vec<QueuedEffect>) {
    for effect in effects {
        effect.run();
    }
}

/// The deferred passive queue. Layout effects never outlive their commit.
#[derive(Default)]
pub(crate) struct EffectScheduler {
    passive: Vec<QueuedEffect>,
}

impl EffectScheduler {
    pub(crate) fn push_passive(&mut self, effect: QueuedEffect) {
        self.passive.push(effect);
    }

    pub(crate) fn take_passive(&mut self) -> Vec<QueuedEffect> {
        std::mem::take(&mut self.passive)
    }

    pub(crate) fn has_passive(&self) -> bool {
        !self.passive.is_empty()
    }

    pub(crate) fn passive_len(&self) -> usize {
        self.passive.len()
    }

    pub(crate) fn discard_instance(&mut self, instance: InstanceId) {
        self.passive.retain(|effect| effect.instance != instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps;

    fn log_effect(
        log: &Rc<RefCell<Vec<String>>>,
        label: &'static str,
    ) -> Box<dyn FnOnce() -> EffectCleanup> {
        let log = Rc::clone(log);
        Box::new(move || {
            log.borrow_mut().push(format!("run {label}"));
            let log = Rc::clone(&log);
            EffectCleanup::new(move || log.borrow_mut().push(format!("cleanup {label}")))
        })
    }

    #[test]
    fn reruns_only_when_deps_change() {
        let id = InstanceId::new(1);
        let log = Rc::new(RefCell::new(Vec::new()));
        let cell = Rc::new(RefCell::new(EffectCell::new(EffectPhase::Passive)));
        let mut ran = Vec::new();

        for (count, label) in [(0, "0"), (1, "1"), (1, "1b"), (2, "2")] {
            if let Some(pending) = PendingEffect::diff(&cell, deps![count], log_effect(&log, label))
            {
                ran.push(label);
                run_effects(vec![pending.commit(id)]);
            }
        }

        assert_eq!(ran, vec!["0", "1", "2"]);
        assert_eq!(
            *log.borrow(),
            vec!["run 0", "cleanup 0", "run 1", "cleanup 1", "run 2"]
        );
    }

    #[test]
    fn uncommitted_render_does_not_advance_deps() {
        let cell = Rc::new(RefCell::new(EffectCell::new(EffectPhase::Layout)));
        let first = PendingEffect::diff(&cell, deps![1], Box::new(EffectCleanup::none));
        assert!(first.is_some());
        drop(first);
        assert!(PendingEffect::diff(&cell, deps![1], Box::new(EffectCleanup::none)).is_some());
    }

    #[test]
    fn dispose_runs_cleanup_once_and_blocks_queued_callbacks() {
        let id = InstanceId::new(1);
        let log = Rc::new(RefCell::new(Vec::new()));
        let cell = Rc::new(RefCell::new(EffectCell::new(EffectPhase::Passive)));

        let first = PendingEffect::diff(&cell, None, log_effect(&log, "a")).unwrap();
        run_effects(vec![first.commit(id)]);
        let second = PendingEffect::diff(&cell, None, log_effect(&log, "b"))
            .unwrap()
            .commit(id);

        EffectCell::dispose(&cell);
        EffectCell::dispose(&cell);
        run_effects(vec![second]);

        assert_eq!(*log.borrow(), vec!["run a", "cleanup a"]);
    }
}
