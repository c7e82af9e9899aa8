use hookwork_core::{
    CommitEvent, Component, InstanceId, MemoryHost, Props, Runtime, RuntimeError,
    RuntimeOptions, RuntimeScheduler,
};
use std::cell::Cell;
use std::rc::Rc;

const MAX_PUMP_ROUNDS: usize = 100;

/// Scheduler that remembers what the runtime asked for.
#[derive(Default)]
pub struct RecordingScheduler {
    flush_requests: Cell<usize>,
    passive_requests: Cell<usize>,
}

impl RecordingScheduler {
    pub fn flush_requests(&self) -> usize {
        self.flush_requests.get()
    }

    pub fn passive_requests(&self) -> usize {
        self.passive_requests.get()
    }
}

impl RuntimeScheduler for RecordingScheduler {
    fn schedule_flush(&self) {
        self.flush_requests.set(self.flush_requests.get() + 1);
    }

    fn schedule_passive(&self) {
        self.passive_requests.set(self.passive_requests.get() + 1);
    }
}

/// Headless harness for exercising components in tests.
///
/// Owns a runtime backed by a [`MemoryHost`] and a [`RecordingScheduler`], and
/// plays the host's part: committing queued writes and running passive
/// effects until nothing is left.
pub struct TestHarness<O: Clone + 'static> {
    runtime: Runtime<O, MemoryHost<O>>,
    scheduler: Rc<RecordingScheduler>,
    root: Option<InstanceId>,
}

impl<O: Clone + 'static> TestHarness<O> {
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    pub fn with_options(options: RuntimeOptions) -> Self {
        let scheduler = Rc::new(RecordingScheduler::default());
        let runtime = Runtime::with_scheduler(MemoryHost::new(), scheduler.clone())
            .with_options(options);
        Self {
            runtime,
            scheduler,
            root: None,
        }
    }

    /// Mounts `component` as the root and drives it until idle.
    pub fn set_content<P: Props>(
        &mut self,
        component: &Component<P, O>,
        props: P,
    ) -> Result<InstanceId, RuntimeError> {
        if let Some(previous) = self.root.take().filter(|id| self.runtime.contains(*id)) {
            self.runtime.unmount(previous)?;
        }
        let root = self.runtime.mount(component, props)?;
        self.root = Some(root);
        self.pump_until_idle()?;
        Ok(root)
    }

    /// Runs `f` as one event-handling task, then drives the runtime until idle.
    pub fn run_task<R>(&mut self, f: impl FnOnce() -> R) -> Result<R, RuntimeError> {
        let value = self.runtime.run_task(f)?;
        self.pump_until_idle()?;
        Ok(value)
    }

    /// Commits pending writes and runs passive effects until neither is left.
    pub fn pump_until_idle(&mut self) -> Result<(), RuntimeError> {
        for _ in 0..MAX_PUMP_ROUNDS {
            if self.runtime.has_pending_work() {
                log::debug!("pump_until_idle: flushing queued writes");
                self.runtime.flush()?;
            } else if self.runtime.pending_passive_effects() > 0 {
                log::debug!("pump_until_idle: running passive effects");
                self.runtime.flush_passive_effects()?;
            } else {
                return Ok(());
            }
        }
        panic!("pump_until_idle looped too many times!");
    }

    pub fn root_id(&self) -> Option<InstanceId> {
        self.root
    }

    pub fn root_output(&self) -> Option<&O> {
        self.root.and_then(|root| self.output(root))
    }

    pub fn output(&self, id: InstanceId) -> Option<&O> {
        self.runtime.host().output(id)
    }

    pub fn render_count(&self, id: InstanceId) -> usize {
        self.runtime.host().render_count(id)
    }

    pub fn children(&self, id: InstanceId) -> Vec<InstanceId> {
        self.runtime.children_of(id).unwrap_or_default()
    }

    pub fn events(&self) -> &[CommitEvent<O>] {
        self.runtime.host().events()
    }

    pub fn take_events(&mut self) -> Vec<CommitEvent<O>> {
        self.runtime.host_mut().take_events()
    }

    pub fn scheduler(&self) -> &RecordingScheduler {
        &self.scheduler
    }

    pub fn runtime(&self) -> &Runtime<O, MemoryHost<O>> {
        &self.runtime
    }

    /// Raw runtime access for scenarios the harness does not cover.
    pub fn runtime_mut(&mut self) -> &mut Runtime<O, MemoryHost<O>> {
        &mut self.runtime
    }
}

impl<O: Clone + 'static> Default for TestHarness<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a harness.
pub fn run_test_harness<O: Clone + 'static, R>(f: impl FnOnce(&mut TestHarness<O>) -> R) -> R {
    let mut harness = TestHarness::new();
    f(&mut harness)
}

#[cfg(test)]
#[path = "tests/testing_tests.rs"]
mod tests;
