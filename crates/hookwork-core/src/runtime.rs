//! The runtime: instance table, batching, and the commit loop.

use crate::collections::map::{HashMap, HashSet};
use crate::commit::{CommitEvent, Host};
use crate::context::Context;
use crate::deps::{shallow_equal, Dependency, Props};
use crate::effects::{run_effects, EffectPhase, EffectScheduler, QueuedEffect};
use crate::instance::{ChildRecord, ChildRequest, Component, ComponentInstance};
use crate::platform::{DefaultScheduler, RuntimeScheduler};
use crate::render_scope::RenderScope;
use crate::scheduler::{PhaseGuard, RuntimeOptions, SchedulerPhase, SchedulerShared};
use crate::slot_store::SlotKind;
use crate::{InstanceId, RuntimeError};
use std::rc::Rc;

/// Everything one commit pass produces before it is handed out.
struct CommitPass<O> {
    /// Instances dirty at the start of the pass.
    dirty: HashSet<InstanceId>,
    rendered: HashSet<InstanceId>,
    events: Vec<CommitEvent<O>>,
    effects: Vec<(usize, QueuedEffect)>,
    error: Option<RuntimeError>,
}

impl<O> Default for CommitPass<O> {
    fn default() -> Self {
        Self {
            dirty: HashSet::default(),
            rendered: HashSet::default(),
            events: Vec::new(),
            effects: Vec::new(),
            error: None,
        }
    }
}

impl<O> CommitPass<O> {
    fn fail(&mut self, err: RuntimeError) {
        self.error.get_or_insert(err);
    }
}

pub struct Runtime<O: 'static, H: Host<O>> {
    host: H,
    shared: Rc<SchedulerShared>,
    instances: HashMap<InstanceId, ComponentInstance<O>>,
    roots: Vec<InstanceId>,
    effects: EffectScheduler,
    options: RuntimeOptions,
}

impl<O: 'static, H: Host<O>> Runtime<O, H> {
    pub fn new(host: H) -> Self {
        Self::with_scheduler(host, Rc::new(DefaultScheduler))
    }

    pub fn with_scheduler(host: H, scheduler: Rc<dyn RuntimeScheduler>) -> Self {
        Self {
            host,
            shared: Rc::new(SchedulerShared::new(scheduler)),
            instances: HashMap::default(),
            roots: Vec::new(),
            effects: EffectScheduler::default(),
            options: RuntimeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.shared.phase()
    }

    /// Mounts a root and commits it, along with any other pending work.
    ///
    /// If the root's own first render fails it is dropped again. An error from
    /// elsewhere in the commit is returned even though the root stays mounted;
    /// it is then listed by [`Runtime::roots`].
    pub fn mount<P: Props>(
        &mut self,
        component: &Component<P, O>,
        props: P,
    ) -> Result<InstanceId, RuntimeError> {
        let id = self.shared.alloc_instance_id();
        log::debug!("mounting root {} {id}", component.name());
        self.instances.insert(
            id,
            ComponentInstance::new(id, None, 0, component.element(props)),
        );
        self.roots.push(id);
        self.shared.mark_dirty(id);

        let result = self.commit();
        let mounted = self.instances.get(&id).is_some_and(|instance| instance.mounted);
        if !mounted {
            self.roots.retain(|root| *root != id);
            self.destroy_subtree(id);
        }
        result.map(|()| id)
    }

    /// Hands new props to an instance. The render happens at the next commit;
    /// a memoized instance whose props compare equal is left alone.
    pub fn update<P: Props>(&mut self, id: InstanceId, props: P) -> Result<(), RuntimeError> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownInstance { id })?;
        let element = instance
            .element
            .with_props(Box::new(props))
            .ok_or(RuntimeError::PropsMismatch {
                id,
                expected: instance.element.props_type(),
            })?;
        if element.is_memoized()
            && shallow_equal(instance.memo_signature.as_ref(), Some(&element.prop_deps()))
        {
            log::trace!("{id}: memoized props unchanged; update ignored");
            instance.pending_element = None;
            return Ok(());
        }
        instance.pending_element = Some(element);
        self.shared.mark_dirty(id);
        self.shared.request_flush();
        Ok(())
    }

    /// Destroys an instance and its subtree. Outstanding cleanups run once,
    /// children first; writes still queued for them are discarded.
    pub fn unmount(&mut self, id: InstanceId) -> Result<(), RuntimeError> {
        let parent = self
            .instances
            .get(&id)
            .ok_or(RuntimeError::UnknownInstance { id })?
            .parent;
        match parent.and_then(|parent| self.instances.get_mut(&parent)) {
            Some(parent) => parent.children.retain(|child| child.id != id),
            None => self.roots.retain(|root| *root != id),
        }
        self.destroy_subtree(id);
        Ok(())
    }

    /// Runs an event-handling task. Writes made by `f` are batched and
    /// committed together once it returns.
    pub fn run_task<R>(&mut self, f: impl FnOnce() -> R) -> Result<R, RuntimeError> {
        let shared = Rc::clone(&self.shared);
        let value = {
            let _batch = PhaseGuard::enter(&shared, SchedulerPhase::Batching);
            f()
        };
        self.commit()?;
        Ok(value)
    }

    /// Commits writes queued outside of a task.
    pub fn flush(&mut self) -> Result<(), RuntimeError> {
        self.commit()
    }

    /// Runs the deferred passive effects as one task, then commits whatever
    /// they wrote.
    pub fn flush_passive_effects(&mut self) -> Result<(), RuntimeError> {
        let effects = self.effects.take_passive();
        if !effects.is_empty() {
            log::debug!("running {} passive effect(s)", effects.len());
            let shared = Rc::clone(&self.shared);
            let _batch = PhaseGuard::enter(&shared, SchedulerPhase::Batching);
            run_effects(effects);
        }
        self.commit()
    }

    /// Publishes a context value from the host. Changed values dirty the
    /// subscribers; call [`Runtime::flush`] to render them.
    pub fn provide<T: Clone + Dependency + 'static>(&mut self, context: &Context<T>, value: T) {
        let dep = value.to_dep();
        self.shared.provide(context.id(), Box::new(value), dep);
    }

    pub fn roots(&self) -> &[InstanceId] {
        &self.roots
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn name_of(&self, id: InstanceId) -> Option<&'static str> {
        self.instances.get(&id).map(ComponentInstance::name)
    }

    pub fn parent_of(&self, id: InstanceId) -> Option<InstanceId> {
        self.instances.get(&id).and_then(|instance| instance.parent)
    }

    pub fn children_of(&self, id: InstanceId) -> Option<Vec<InstanceId>> {
        self.instances
            .get(&id)
            .map(|instance| instance.children.iter().map(|child| child.id).collect())
    }

    pub fn slot_kinds(&self, id: InstanceId) -> Option<Vec<SlotKind>> {
        self.instances.get(&id).map(|instance| instance.store.kinds())
    }

    pub fn is_dirty(&self, id: InstanceId) -> bool {
        self.shared.is_dirty(id)
    }

    pub fn has_pending_work(&self) -> bool {
        self.shared.has_updates() || self.shared.has_dirty()
    }

    pub fn pending_passive_effects(&self) -> usize {
        self.effects.passive_len()
    }

    pub fn context_subscribers<T>(&self, context: &Context<T>) -> usize
    where
        T: Clone + Dependency + 'static,
    {
        self.shared.contexts().borrow().subscriber_count(context.id())
    }

    fn commit(&mut self) -> Result<(), RuntimeError> {
        let shared = Rc::clone(&self.shared);
        let _commit = PhaseGuard::enter(&shared, SchedulerPhase::Committing);
        let mut error = None;
        let mut passes = 0;

        loop {
            self.apply_updates();
            if !shared.has_dirty() {
                break;
            }
            if passes == self.options.max_commit_passes {
                log::warn!("commit cut off after {passes} passes; instances keep re-dirtying");
                shared.take_dirty();
                error = Some(RuntimeError::RenderLoop { passes });
                break;
            }
            passes += 1;

            let mut pass = CommitPass::default();
            let mut dirty = shared.take_dirty();
            dirty.retain(|id| self.instances.contains_key(id));
            dirty.sort_by_key(|id| (self.instances.get(id).map_or(0, |i| i.depth), *id));
            log::debug!("commit pass {passes}: {} dirty instance(s)", dirty.len());
            pass.dirty = dirty.iter().copied().collect();
            for id in dirty {
                if !pass.rendered.contains(&id) && self.instances.contains_key(&id) {
                    self.render_instance(id, &mut pass);
                }
            }

            let CommitPass {
                events,
                mut effects,
                error: pass_error,
                ..
            } = pass;
            if error.is_none() {
                error = pass_error;
            }
            for event in events {
                self.host.commit(event);
            }
            // Deeper instances first; declaration order within an instance.
            effects.sort_by_key(|(depth, _)| std::cmp::Reverse(*depth));
            let mut layout = Vec::new();
            for (_, effect) in effects {
                match effect.phase() {
                    EffectPhase::Layout => layout.push(effect),
                    EffectPhase::Passive => self.effects.push_passive(effect),
                }
            }
            run_effects(layout);
        }

        if self.effects.has_passive() {
            shared.scheduler().schedule_passive();
        }
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply_updates(&mut self) {
        for update in self.shared.take_updates() {
            let Some(instance) = self.instances.get_mut(&update.instance) else {
                log::debug!("dropping write for unmounted {}", update.instance);
                continue;
            };
            let applied = instance
                .store
                .slot_data_mut(update.slot)
                .is_some_and(|slot| (update.action)(slot));
            if applied {
                self.shared.mark_dirty(update.instance);
            } else {
                log::warn!(
                    "{}: write to slot #{} no longer matches its hook",
                    update.instance,
                    update.slot
                );
            }
        }
    }

    /// Renders one instance, then reconciles and renders its children.
    /// Returns whether the render committed.
    fn render_instance(&mut self, id: InstanceId, pass: &mut CommitPass<O>) -> bool {
        pass.rendered.insert(id);
        self.shared.clear_dirty(id);
        let shared = Rc::clone(&self.shared);
        let Some(instance) = self.instances.get_mut(&id) else {
            return false;
        };

        let pending = instance.pending_element.take();
        let ComponentInstance {
            element,
            store,
            contexts,
            children,
            ..
        } = &mut *instance;
        let active = pending.as_deref().unwrap_or(&**element);
        log::trace!("{id}: rendering {}", active.name());
        let result = {
            let mut scope = RenderScope::new(id, store, &shared, contexts, children);
            active
                .render(&mut scope)
                .and_then(|output| scope.finish(output))
        };

        let frame = match result {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("{id}: render of {} aborted: {err}", active.name());
                instance.pending_element = pending;
                pass.fail(err);
                return false;
            }
        };

        if let Some(pending) = pending {
            instance.element = pending;
        }
        for write in frame.slot_writes {
            write();
        }
        instance.memo_signature = instance
            .element
            .is_memoized()
            .then(|| instance.element.prop_deps());
        let was_mounted = std::mem::replace(&mut instance.mounted, true);
        let depth = instance.depth;
        let parent = instance.parent;
        let name = instance.name();
        let previous = std::mem::take(&mut instance.children);

        let children = self.reconcile_children(id, depth, previous, frame.children, pass);
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.children = children;
        }

        for effect in frame.effects {
            pass.effects.push((depth, effect.commit(id)));
        }
        pass.events.push(if was_mounted {
            CommitEvent::Update {
                id,
                name,
                output: frame.output,
            }
        } else {
            CommitEvent::Mount {
                id,
                parent,
                name,
                output: frame.output,
            }
        });
        true
    }

    fn reconcile_children(
        &mut self,
        parent: InstanceId,
        depth: usize,
        previous: Vec<ChildRecord>,
        requests: Vec<ChildRequest<O>>,
        pass: &mut CommitPass<O>,
    ) -> Vec<ChildRecord> {
        let kept: HashSet<InstanceId> = requests
            .iter()
            .filter(|request| request.reused)
            .map(|request| request.id)
            .collect();
        for stale in previous.iter().filter(|child| !kept.contains(&child.id)) {
            log::debug!("{parent}: child {} left the tree", stale.id);
            self.destroy_subtree(stale.id);
        }

        let mut records = Vec::with_capacity(requests.len());
        for request in requests {
            let record = request.record();
            let id = request.id;
            if request.reused && self.instances.contains_key(&id) {
                if pass.rendered.contains(&id) || !self.should_render_child(id, &request, pass) {
                    log::trace!("{parent}: child {id} kept without rendering");
                    records.push(record);
                    continue;
                }
                if let Some(child) = self.instances.get_mut(&id) {
                    child.pending_element = Some(request.element);
                }
                self.render_instance(id, pass);
                records.push(record);
            } else {
                self.instances.insert(
                    id,
                    ComponentInstance::new(id, Some(parent), depth + 1, request.element),
                );
                if self.render_instance(id, pass) {
                    records.push(record);
                } else {
                    self.destroy_subtree(id);
                }
            }
        }
        records
    }

    /// Unwrapped children always follow their parent. Memoized ones only on
    /// changed props or when dirtied by their own state or a context, either
    /// before this pass started or by a provide during it.
    fn should_render_child(
        &self,
        id: InstanceId,
        request: &ChildRequest<O>,
        pass: &CommitPass<O>,
    ) -> bool {
        if !request.element.is_memoized() || pass.dirty.contains(&id) || self.shared.is_dirty(id)
        {
            return true;
        }
        let next = request.element.prop_deps();
        self.instances
            .get(&id)
            .map_or(true, |child| !shallow_equal(child.memo_signature.as_ref(), Some(&next)))
    }

    fn destroy_subtree(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.remove(&id) else {
            return;
        };
        for child in &instance.children {
            self.destroy_subtree(child.id);
        }
        instance.dispose_effects();
        self.shared
            .contexts()
            .borrow_mut()
            .unsubscribe(id, instance.contexts.iter().copied());
        let dropped = self.shared.discard_instance(id);
        self.effects.discard_instance(id);
        log::debug!(
            "unmounted {} {id}; {dropped} queued write(s) discarded",
            instance.name()
        );
        if instance.mounted {
            self.host.commit(CommitEvent::Unmount { id });
        }
    }
}
