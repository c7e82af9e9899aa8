//! Batching state shared between the runtime and the handles it gives out.
//!
//! Setters and dispatchers hold a `Weak` to [`SchedulerShared`]; everything
//! they do goes through the update queue and the dirty set kept here.

use crate::collections::map::HashSet;
use crate::context::{ContextId, ContextStore};
use crate::platform::RuntimeScheduler;
use crate::state::PendingUpdate;
use crate::InstanceId;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum SchedulerPhase {
    #[default]
    Idle,
    Batching,
    Committing,
}

/// Runtime tuning knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Commit passes allowed before a commit is declared a render loop.
    pub max_commit_passes: usize,
}

impl RuntimeOptions {
    pub const DEFAULT_MAX_COMMIT_PASSES: usize = 100;

    pub fn with_max_commit_passes(mut self, passes: usize) -> Self {
        self.max_commit_passes = passes.max(1);
        self
    }
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_commit_passes: Self::DEFAULT_MAX_COMMIT_PASSES,
        }
    }
}

pub(crate) struct SchedulerShared {
    phase: Cell<SchedulerPhase>,
    updates: RefCell<Vec<PendingUpdate>>,
    dirty: RefCell<HashSet<InstanceId>>,
    contexts: RefCell<ContextStore>,
    scheduler: Rc<dyn RuntimeScheduler>,
    flush_requested: Cell<bool>,
    next_instance: Cell<u64>,
}

impl SchedulerShared {
    pub(crate) fn new(scheduler: Rc<dyn RuntimeScheduler>) -> Self {
        Self {
            phase: Cell::new(SchedulerPhase::Idle),
            updates: RefCell::new(Vec::new()),
            dirty: RefCell::new(HashSet::default()),
            contexts: RefCell::new(ContextStore::default()),
            scheduler,
            flush_requested: Cell::new(false),
            next_instance: Cell::new(1),
        }
    }

    pub(crate) fn phase(&self) -> SchedulerPhase {
        self.phase.get()
    }

    pub(crate) fn scheduler(&self) -> &Rc<dyn RuntimeScheduler> {
        &self.scheduler
    }

    pub(crate) fn alloc_instance_id(&self) -> InstanceId {
        let id = self.next_instance.get();
        self.next_instance.set(id + 1);
        InstanceId::new(id)
    }

    /// Queues a write and marks its instance dirty. Outside of a task the
    /// host is asked, once, to flush.
    pub(crate) fn enqueue_update(&self, update: PendingUpdate) {
        let instance = update.instance;
        self.updates.borrow_mut().push(update);
        self.mark_dirty(instance);
        self.request_flush();
    }

    pub(crate) fn request_flush(&self) {
        if self.phase.get() == SchedulerPhase::Idle && !self.flush_requested.replace(true) {
            log::debug!("work queued outside a task; requesting flush");
            self.scheduler.schedule_flush();
        }
    }

    pub(crate) fn take_updates(&self) -> Vec<PendingUpdate> {
        std::mem::take(&mut *self.updates.borrow_mut())
    }

    pub(crate) fn has_updates(&self) -> bool {
        !self.updates.borrow().is_empty()
    }

    pub(crate) fn mark_dirty(&self, instance: InstanceId) {
        self.dirty.borrow_mut().insert(instance);
    }

    pub(crate) fn clear_dirty(&self, instance: InstanceId) {
        self.dirty.borrow_mut().remove(&instance);
    }

    pub(crate) fn is_dirty(&self, instance: InstanceId) -> bool {
        self.dirty.borrow().contains(&instance)
    }

    pub(crate) fn has_dirty(&self) -> bool {
        !self.dirty.borrow().is_empty()
    }

    pub(crate) fn take_dirty(&self) -> Vec<InstanceId> {
        self.dirty.borrow_mut().drain().collect()
    }

    /// Drops queued writes addressed to `instance`.
    pub(crate) fn discard_instance(&self, instance: InstanceId) -> usize {
        let mut updates = self.updates.borrow_mut();
        let before = updates.len();
        updates.retain(|update| update.instance != instance);
        self.clear_dirty(instance);
        before - updates.len()
    }

    /// Publishes a context value, dirtying subscribers if it changed.
    pub(crate) fn provide(&self, id: ContextId, value: Box<dyn Any>, dep: crate::Dep) {
        let woken = self.contexts.borrow_mut().provide(id, value, dep);
        if woken.is_empty() {
            return;
        }
        log::debug!("context {id:?} changed; {} subscriber(s) dirty", woken.len());
        for instance in woken {
            self.mark_dirty(instance);
        }
        self.request_flush();
    }

    pub(crate) fn contexts(&self) -> &RefCell<ContextStore> {
        &self.contexts
    }
}

/// Holds the scheduler in `phase` and returns it to idle when dropped, also on
/// unwind out of a panicking effect.
pub(crate) struct PhaseGuard<'a> {
    shared: &'a SchedulerShared,
}

impl<'a> PhaseGuard<'a> {
    pub(crate) fn enter(shared: &'a SchedulerShared, phase: SchedulerPhase) -> Self {
        log::debug!("scheduler {:?} -> {phase:?}", shared.phase.get());
        shared.phase.set(phase);
        if phase == SchedulerPhase::Committing {
            shared.flush_requested.set(false);
        }
        Self { shared }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.shared.phase.set(SchedulerPhase::Idle);
    }
}
