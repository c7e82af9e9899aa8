//! State and reducer slots, and the handles render functions use to write them.
//!
//! Writes never touch a slot directly. They become [`PendingUpdate`]s that the
//! scheduler applies, in order, at the start of the next commit.

use crate::deps::{Dep, Dependency, Identity};
use crate::scheduler::SchedulerShared;
use crate::InstanceId;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

/// Applies a queued write to a type-erased slot. Returns `false` when the
/// slot no longer holds the type the write was issued for.
pub(crate) type UpdateAction = Box<dyn FnOnce(&mut dyn Any) -> bool>;

pub(crate) struct PendingUpdate {
    pub(crate) instance: InstanceId,
    pub(crate) slot: usize,
    pub(crate) action: UpdateAction,
}

pub(crate) struct StateCell<T> {
    value: T,
    dirty: bool,
    setter: StateSetter<T>,
}

impl<T: Clone + 'static> StateCell<T> {
    pub(crate) fn new(value: T, setter: StateSetter<T>) -> Self {
        Self {
            value,
            dirty: false,
            setter,
        }
    }

    pub(crate) fn read(&self) -> (T, StateSetter<T>) {
        (self.value.clone(), self.setter.clone())
    }

    /// Whether queued writes landed since the last render; clears the flag.
    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

pub(crate) struct ReducerCell<S, A> {
    state: S,
    reducer: Rc<dyn Fn(&S, A) -> S>,
    dirty: bool,
    dispatch: Dispatch<A>,
}

impl<S: Clone + 'static, A: 'static> ReducerCell<S, A> {
    pub(crate) fn new(state: S, reducer: Rc<dyn Fn(&S, A) -> S>, dispatch: Dispatch<A>) -> Self {
        Self {
            state,
            reducer,
            dirty: false,
            dispatch,
        }
    }

    /// Installs the reducer of the current render and reads the state.
    pub(crate) fn read(&mut self, reducer: Rc<dyn Fn(&S, A) -> S>) -> (S, Dispatch<A>) {
        self.reducer = reducer;
        (self.state.clone(), self.dispatch.clone())
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    fn apply(&mut self, action: A) {
        self.state = (self.reducer)(&self.state, action);
        self.dirty = true;
    }
}

struct SlotTarget {
    instance: InstanceId,
    slot: usize,
    shared: Weak<SchedulerShared>,
}

impl SlotTarget {
    fn enqueue(&self, action: UpdateAction) {
        match self.shared.upgrade() {
            Some(shared) => shared.enqueue_update(PendingUpdate {
                instance: self.instance,
                slot: self.slot,
                action,
            }),
            None => log::debug!(
                "{}: dropping write to slot #{} after runtime shutdown",
                self.instance,
                self.slot
            ),
        }
    }
}

/// Writes a state slot. Identity is stable for the lifetime of the slot.
pub struct StateSetter<T> {
    target: Rc<SlotTarget>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> StateSetter<T> {
    pub(crate) fn new(instance: InstanceId, slot: usize, shared: Weak<SchedulerShared>) -> Self {
        Self {
            target: Rc::new(SlotTarget {
                instance,
                slot,
                shared,
            }),
            _marker: PhantomData,
        }
    }

    /// Replaces the value. Later writes in the same batch win.
    pub fn set(&self, value: T) {
        self.write(move |_| value);
    }

    /// Computes the next value from the one left by earlier writes in the batch.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        self.write(f);
    }

    pub fn instance(&self) -> InstanceId {
        self.target.instance
    }

    fn write(&self, next: impl FnOnce(&T) -> T + 'static) {
        self.target.enqueue(Box::new(move |slot: &mut dyn Any| {
            match slot.downcast_mut::<StateCell<T>>() {
                Some(cell) => {
                    cell.value = next(&cell.value);
                    cell.dirty = true;
                    true
                }
                None => false,
            }
        }));
    }
}

impl<T> Dependency for StateSetter<T> {
    fn to_dep(&self) -> Dep {
        Dep::Ref(Identity::of(&self.target))
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("instance", &self.target.instance)
            .field("slot", &self.target.slot)
            .finish()
    }
}

/// Sends actions to a reducer slot.
pub struct Dispatch<A> {
    target: Rc<SlotTarget>,
    wrap: fn(A) -> UpdateAction,
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
            wrap: self.wrap,
        }
    }
}

fn reducer_action<S: Clone + 'static, A: 'static>(action: A) -> UpdateAction {
    Box::new(move |slot: &mut dyn Any| match slot.downcast_mut::<ReducerCell<S, A>>() {
        Some(cell) => {
            cell.apply(action);
            true
        }
        None => false,
    })
}

impl<A: 'static> Dispatch<A> {
    pub(crate) fn new<S: Clone + 'static>(
        instance: InstanceId,
        slot: usize,
        shared: Weak<SchedulerShared>,
    ) -> Self {
        Self {
            target: Rc::new(SlotTarget {
                instance,
                slot,
                shared,
            }),
            wrap: reducer_action::<S, A>,
        }
    }

    /// Queues `action`; it is reduced with the reducer of the latest render.
    pub fn dispatch(&self, action: A) {
        self.target.enqueue((self.wrap)(action));
    }

    pub fn instance(&self) -> InstanceId {
        self.target.instance
    }
}

impl<A> Dependency for Dispatch<A> {
    fn to_dep(&self) -> Dep {
        Dep::Ref(Identity::of(&self.target))
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("instance", &self.target.instance)
            .field("slot", &self.target.slot)
            .finish()
    }
}
