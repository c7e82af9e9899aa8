//! Context keys and the publish/subscribe registry behind them.

use crate::collections::map::{HashMap, HashSet};
use crate::deps::{Dep, Dependency};
use crate::InstanceId;
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

fn next_context_id() -> ContextId {
    ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Key of a broadcast value. Consumers read `default()` until someone provides.
pub struct Context<T> {
    id: ContextId,
    name: &'static str,
    default: Rc<dyn Fn() -> T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            default: Rc::clone(&self.default),
        }
    }
}

impl<T> PartialEq for Context<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Context<T> {}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl<T: Clone + Dependency + 'static> Context<T> {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

pub fn create_context<T: Clone + Dependency + 'static>(
    name: &'static str,
    default: impl Fn() -> T + 'static,
) -> Context<T> {
    Context {
        id: next_context_id(),
        name,
        default: Rc::new(default),
    }
}

struct ContextEntry {
    value: Option<Box<dyn Any>>,
    dep: Dep,
    subscribers: HashSet<InstanceId>,
}

impl Default for ContextEntry {
    fn default() -> Self {
        Self {
            value: None,
            dep: Dep::Nil,
            subscribers: HashSet::default(),
        }
    }
}

#[derive(Default)]
pub(crate) struct ContextStore {
    entries: HashMap<ContextId, ContextEntry>,
}

impl ContextStore {
    /// Stores `value` and returns the subscribers to dirty. Nothing is returned
    /// when the previous value compares equal to `dep`; a first provide always
    /// counts as a change.
    pub(crate) fn provide(
        &mut self,
        id: ContextId,
        value: Box<dyn Any>,
        dep: Dep,
    ) -> Vec<InstanceId> {
        let entry = self.entries.entry(id).or_default();
        let changed = entry.value.is_none() || entry.dep != dep;
        entry.value = Some(value);
        entry.dep = dep;
        if !changed {
            return Vec::new();
        }
        entry.subscribers.iter().copied().collect()
    }

    /// Subscribes `instance` and returns the provided value, if any.
    pub(crate) fn consume<T: Clone + 'static>(
        &mut self,
        id: ContextId,
        instance: InstanceId,
    ) -> Option<T> {
        let entry = self.entries.entry(id).or_default();
        entry.subscribers.insert(instance);
        entry
            .value
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub(crate) fn unsubscribe(
        &mut self,
        instance: InstanceId,
        ids: impl IntoIterator<Item = ContextId>,
    ) {
        for id in ids {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.subscribers.remove(&instance);
            }
        }
    }

    pub(crate) fn subscriber_count(&self, id: ContextId) -> usize {
        self.entries
            .get(&id)
            .map_or(0, |entry| entry.subscribers.len())
    }
}
