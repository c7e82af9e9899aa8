//! The host side of a commit.

use crate::collections::map::HashMap;
use crate::InstanceId;

/// One change the runtime hands to the host per committed instance.
#[derive(Clone, Debug, PartialEq)]
pub enum CommitEvent<O> {
    Mount {
        id: InstanceId,
        parent: Option<InstanceId>,
        name: &'static str,
        output: O,
    },
    Update {
        id: InstanceId,
        name: &'static str,
        output: O,
    },
    Unmount {
        id: InstanceId,
    },
}

impl<O> CommitEvent<O> {
    pub fn id(&self) -> InstanceId {
        match self {
            CommitEvent::Mount { id, .. }
            | CommitEvent::Update { id, .. }
            | CommitEvent::Unmount { id } => *id,
        }
    }

    pub fn output(&self) -> Option<&O> {
        match self {
            CommitEvent::Mount { output, .. } | CommitEvent::Update { output, .. } => Some(output),
            CommitEvent::Unmount { .. } => None,
        }
    }
}

/// Receives committed render outputs.
pub trait Host<O> {
    fn commit(&mut self, event: CommitEvent<O>);
}

impl<O, F> Host<O> for F
where
    F: FnMut(CommitEvent<O>),
{
    fn commit(&mut self, event: CommitEvent<O>) {
        self(event)
    }
}

/// Host that keeps every event and the latest output of each live instance.
pub struct MemoryHost<O> {
    events: Vec<CommitEvent<O>>,
    outputs: HashMap<InstanceId, O>,
}

impl<O> Default for MemoryHost<O> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            outputs: HashMap::default(),
        }
    }
}

impl<O: Clone> MemoryHost<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self, id: InstanceId) -> Option<&O> {
        self.outputs.get(&id)
    }

    pub fn events(&self) -> &[CommitEvent<O>] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<CommitEvent<O>> {
        std::mem::take(&mut self.events)
    }

    /// Mount and update events recorded for `id`.
    pub fn render_count(&self, id: InstanceId) -> usize {
        self.events
            .iter()
            .filter(|event| event.id() == id && event.output().is_some())
            .count()
    }

    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.outputs.contains_key(&id)
    }
}

impl<O: Clone> Host<O> for MemoryHost<O> {
    fn commit(&mut self, event: CommitEvent<O>) {
        match &event {
            CommitEvent::Mount { id, output, .. } | CommitEvent::Update { id, output, .. } => {
                self.outputs.insert(*id, output.clone());
            }
            CommitEvent::Unmount { id } => {
                self.outputs.remove(id);
            }
        }
        self.events.push(event);
    }
}
