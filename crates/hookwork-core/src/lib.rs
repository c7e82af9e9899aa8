#![doc = r"Core runtime of Hookwork, a hook-based reactive component model."]

pub mod collections;
mod commit;
pub mod context;
pub mod deps;
pub mod effects;
pub mod handles;
mod instance;
pub mod platform;
mod render_scope;
mod runtime;
mod scheduler;
pub mod slot_store;
mod state;

pub use commit::{CommitEvent, Host, MemoryHost};
pub use context::{create_context, Context, ContextId};
pub use deps::{shallow_equal, Dep, Dependency, Deps, Identity, Props};
pub use effects::{EffectCleanup, EffectPhase};
pub use handles::{Callback, RefBox};
pub use instance::Component;
pub use platform::{DefaultScheduler, RuntimeScheduler};
pub use render_scope::RenderScope;
pub use runtime::Runtime;
pub use scheduler::{RuntimeOptions, SchedulerPhase};
pub use slot_store::{HookSlotStore, SlotKind};
pub use state::{Dispatch, StateSetter};

use std::fmt;
use std::hash::{Hash, Hasher};

pub type Key = u64;

/// Identity of a mounted component instance. Never reused within a runtime.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    /// A hook of another kind than last time was called at `index`.
    HookOrder {
        instance: InstanceId,
        index: usize,
        expected: SlotKind,
        found: SlotKind,
    },
    /// A render called a different number of hooks than the previous one.
    HookCount {
        instance: InstanceId,
        expected: usize,
        found: usize,
    },
    /// Same hook kind at `index`, but holding another value type.
    HookType { instance: InstanceId, index: usize },
    UnknownInstance { id: InstanceId },
    PropsMismatch { id: InstanceId, expected: &'static str },
    RenderLoop { passes: usize },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::HookOrder {
                instance,
                index,
                expected,
                found,
            } => write!(
                f,
                "hook order changed in {instance}: slot {index} was {expected}, now {found}"
            ),
            RuntimeError::HookCount {
                instance,
                expected,
                found,
            } => write!(
                f,
                "hook count changed in {instance}: expected {expected} hooks, found {found}"
            ),
            RuntimeError::HookType { instance, index } => {
                write!(f, "hook slot {index} of {instance} changed its value type")
            }
            RuntimeError::UnknownInstance { id } => write!(f, "instance {id} is not mounted"),
            RuntimeError::PropsMismatch { id, expected } => {
                write!(f, "instance {id} props type mismatch; expected {expected}")
            }
            RuntimeError::RenderLoop { passes } => {
                write!(f, "render loop: still dirty after {passes} commit passes")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Hashes any key the same way `child_keyed` does.
pub fn hash_key<K: Hash>(key: &K) -> Key {
    let mut hasher = collections::hasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod runtime_tests;

#[cfg(test)]
#[path = "tests/hook_tests.rs"]
mod hook_tests;

#[cfg(test)]
#[path = "tests/tree_tests.rs"]
mod tree_tests;
