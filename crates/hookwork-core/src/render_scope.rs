//! The scope a render function receives. Every hook is a method on it.
//!
//! Hooks claim slots from the instance's [`HookSlotStore`] in call order, so
//! they must be called unconditionally and in the same order on every render.

use crate::collections::map::HashSet;
use crate::context::{Context, ContextId};
use crate::deps::{shallow_equal, Dependency, Deps, Props};
use crate::effects::{EffectCell, EffectCleanup, EffectPhase, PendingEffect};
use crate::handles::{Callback, RefBox};
use crate::instance::{ChildKey, ChildRecord, ChildRequest, Component};
use crate::scheduler::SchedulerShared;
use crate::slot_store::{HookSlotStore, SlotKind};
use crate::state::{Dispatch, ReducerCell, StateCell, StateSetter};
use crate::{hash_key, InstanceId, RuntimeError};
use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

struct MemoCell<T> {
    value: Option<Rc<T>>,
    deps: Option<Deps>,
}

struct CallbackCell<A, R> {
    callback: Option<Callback<A, R>>,
    deps: Option<Deps>,
}

/// Slot write held back until the render that made it commits.
pub(crate) type SlotWrite = Box<dyn FnOnce()>;

/// What a successful render leaves for the commit.
pub(crate) struct RenderFrame<O> {
    pub(crate) output: O,
    pub(crate) slot_writes: Vec<SlotWrite>,
    pub(crate) effects: Vec<PendingEffect>,
    pub(crate) children: Vec<ChildRequest<O>>,
}

pub struct RenderScope<'a, O> {
    instance: InstanceId,
    store: &'a mut HookSlotStore,
    shared: &'a Rc<SchedulerShared>,
    contexts: &'a mut HashSet<ContextId>,
    previous_children: &'a [ChildRecord],
    claimed: Vec<bool>,
    next_position: usize,
    slot_writes: Vec<SlotWrite>,
    effects: Vec<PendingEffect>,
    children: Vec<ChildRequest<O>>,
}

impl<'a, O: 'static> RenderScope<'a, O> {
    pub(crate) fn new(
        instance: InstanceId,
        store: &'a mut HookSlotStore,
        shared: &'a Rc<SchedulerShared>,
        contexts: &'a mut HashSet<ContextId>,
        previous_children: &'a [ChildRecord],
    ) -> Self {
        store.begin_pass();
        Self {
            instance,
            store,
            shared,
            contexts,
            previous_children,
            claimed: vec![false; previous_children.len()],
            next_position: 0,
            slot_writes: Vec::new(),
            effects: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    /// Local state. Returns the committed value and a setter whose writes are
    /// applied at the next commit.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(T, StateSetter<T>), RuntimeError> {
        let instance = self.instance;
        let shared = Rc::downgrade(self.shared);
        let (index, cell) = self.store.next_slot(instance, SlotKind::State, |index| {
            StateCell::new(init(), StateSetter::new(instance, index, shared))
        })?;
        if cell.take_dirty() {
            log::trace!("{instance}: state slot #{index} picked up queued writes");
        }
        Ok(cell.read())
    }

    /// Reducer state. Queued actions are reduced, in order, with the reducer
    /// passed to the most recent render.
    pub fn use_reducer<S: Clone + 'static, A: 'static>(
        &mut self,
        reducer: impl Fn(&S, A) -> S + 'static,
        init: impl FnOnce() -> S,
    ) -> Result<(S, Dispatch<A>), RuntimeError> {
        let instance = self.instance;
        let shared = Rc::downgrade(self.shared);
        let reducer: Rc<dyn Fn(&S, A) -> S> = Rc::new(reducer);
        let first = Rc::clone(&reducer);
        let (index, cell) = self.store.next_slot(instance, SlotKind::Reducer, |index| {
            ReducerCell::new(init(), first, Dispatch::new::<S>(instance, index, shared))
        })?;
        if cell.take_dirty() {
            log::trace!("{instance}: reducer slot #{index} picked up queued actions");
        }
        Ok(cell.read(reducer))
    }

    /// Schedules `effect` for `phase` when `deps` changed since the last
    /// committed render. `None` deps run it after every render.
    pub fn use_effect<R: Into<EffectCleanup>>(
        &mut self,
        phase: EffectPhase,
        deps: Option<Deps>,
        effect: impl FnOnce() -> R + 'static,
    ) -> Result<(), RuntimeError> {
        let (_, cell) = self
            .store
            .next_slot(self.instance, SlotKind::Effect(phase), |_| {
                Rc::new(RefCell::new(EffectCell::new(phase)))
            })?;
        let callback = Box::new(move || -> EffectCleanup { effect().into() });
        if let Some(pending) = PendingEffect::diff(cell, deps, callback) {
            self.effects.push(pending);
        }
        Ok(())
    }

    pub fn use_layout_effect<R: Into<EffectCleanup>>(
        &mut self,
        deps: Option<Deps>,
        effect: impl FnOnce() -> R + 'static,
    ) -> Result<(), RuntimeError> {
        self.use_effect(EffectPhase::Layout, deps, effect)
    }

    pub fn use_passive_effect<R: Into<EffectCleanup>>(
        &mut self,
        deps: Option<Deps>,
        effect: impl FnOnce() -> R + 'static,
    ) -> Result<(), RuntimeError> {
        self.use_effect(EffectPhase::Passive, deps, effect)
    }

    /// Cached value; `producer` only runs when `deps` changed since the last
    /// committed render.
    pub fn use_memo<T: 'static>(
        &mut self,
        deps: Option<Deps>,
        producer: impl FnOnce() -> T,
    ) -> Result<Rc<T>, RuntimeError> {
        let (index, cell) = self.store.next_slot(self.instance, SlotKind::Memo, |_| {
            Rc::new(RefCell::new(MemoCell {
                value: None,
                deps: None,
            }))
        })?;
        let cell = Rc::clone(cell);
        {
            let cached = cell.borrow();
            if let Some(value) = cached
                .value
                .as_ref()
                .filter(|_| shallow_equal(cached.deps.as_ref(), deps.as_ref()))
            {
                return Ok(Rc::clone(value));
            }
        }
        log::trace!("{}: recomputing memo slot #{index}", self.instance);
        let value = Rc::new(producer());
        let staged = Rc::clone(&value);
        self.slot_writes.push(Box::new(move || {
            let mut cell = cell.borrow_mut();
            cell.value = Some(staged);
            cell.deps = deps;
        }));
        Ok(value)
    }

    /// Cached function identity; `f` replaces the cache only when `deps`
    /// changed since the last committed render.
    pub fn use_callback<A: 'static, R: 'static>(
        &mut self,
        deps: Option<Deps>,
        f: impl Fn(A) -> R + 'static,
    ) -> Result<Callback<A, R>, RuntimeError> {
        let (_, cell) = self
            .store
            .next_slot(self.instance, SlotKind::Callback, |_| {
                Rc::new(RefCell::new(CallbackCell {
                    callback: None,
                    deps: None,
                }))
            })?;
        let cell = Rc::clone(cell);
        {
            let cached = cell.borrow();
            if let Some(callback) = cached
                .callback
                .as_ref()
                .filter(|_| shallow_equal(cached.deps.as_ref(), deps.as_ref()))
            {
                return Ok(callback.clone());
            }
        }
        let callback = Callback::new(f);
        let staged = callback.clone();
        self.slot_writes.push(Box::new(move || {
            let mut cell = cell.borrow_mut();
            cell.callback = Some(staged);
            cell.deps = deps;
        }));
        Ok(callback)
    }

    pub fn use_ref<T: 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<RefBox<T>, RuntimeError> {
        let (_, cell) = self
            .store
            .next_slot(self.instance, SlotKind::Ref, |_| RefBox::new(init()))?;
        Ok(cell.clone())
    }

    /// Publishes `value` under `context`. Subscribers are dirtied only when it
    /// differs from the previous value under shallow comparison.
    pub fn provide_context<T: Clone + Dependency + 'static>(
        &mut self,
        context: &Context<T>,
        value: T,
    ) {
        let dep = value.to_dep();
        self.shared.provide(context.id(), Box::new(value), dep);
    }

    /// Reads `context` and subscribes this instance to it until unmount.
    pub fn use_context<T: Clone + Dependency + 'static>(&mut self, context: &Context<T>) -> T {
        self.contexts.insert(context.id());
        let value = self
            .shared
            .contexts()
            .borrow_mut()
            .consume::<T>(context.id(), self.instance);
        value.unwrap_or_else(|| context.default_value())
    }

    /// Renders `component` as the next positional child.
    pub fn child<P: Props>(&mut self, component: &Component<P, O>, props: P) -> InstanceId {
        let key = ChildKey::Position(self.next_position);
        self.next_position += 1;
        self.push_child(key, component, props)
    }

    /// Renders `component` as a child matched by `key` instead of position.
    pub fn child_keyed<K: Hash, P: Props>(
        &mut self,
        key: &K,
        component: &Component<P, O>,
        props: P,
    ) -> InstanceId {
        self.push_child(ChildKey::Keyed(hash_key(key)), component, props)
    }

    fn push_child<P: Props>(
        &mut self,
        key: ChildKey,
        component: &Component<P, O>,
        props: P,
    ) -> InstanceId {
        let element = component.element(props);
        let component_id = element.component_id();
        let matched = self
            .previous_children
            .iter()
            .zip(&self.claimed)
            .position(|(record, claimed)| {
                !claimed && record.key == key && std::ptr::eq(record.component, component_id)
            });
        let (id, reused) = match matched {
            Some(index) => {
                self.claimed[index] = true;
                (self.previous_children[index].id, true)
            }
            None => (self.shared.alloc_instance_id(), false),
        };
        self.children.push(ChildRequest {
            key,
            id,
            reused,
            element,
        });
        id
    }

    /// Closes the slot pass and packages the render for the commit.
    pub(crate) fn finish(self, output: O) -> Result<RenderFrame<O>, RuntimeError> {
        self.store.end_pass(self.instance)?;
        Ok(RenderFrame {
            output,
            slot_writes: self.slot_writes,
            effects: self.effects,
            children: self.children,
        })
    }
}
