pub mod app;

use app::{tour_app, Frame};
use hookwork_core::{InstanceId, MemoryHost, Runtime, RuntimeError};

/// Drives the tour app the way an event loop would: every press is one task,
/// followed by the passive effects and whatever they write.
pub struct Tour {
    runtime: Runtime<Frame, MemoryHost<Frame>>,
    root: InstanceId,
}

impl Tour {
    pub fn start() -> Result<Self, RuntimeError> {
        let mut runtime = Runtime::new(MemoryHost::new());
        let root = runtime.mount(&tour_app(), ())?;
        let mut tour = Self { runtime, root };
        tour.settle()?;
        Ok(tour)
    }

    pub fn root(&self) -> InstanceId {
        self.root
    }

    pub fn runtime(&self) -> &Runtime<Frame, MemoryHost<Frame>> {
        &self.runtime
    }

    /// Runs passive effects and queued writes until the tree is quiet.
    pub fn settle(&mut self) -> Result<(), RuntimeError> {
        let limit = self.runtime.options().max_commit_passes;
        for _ in 0..limit {
            if self.runtime.pending_passive_effects() > 0 {
                self.runtime.flush_passive_effects()?;
            } else if self.runtime.has_pending_work() {
                self.runtime.flush()?;
            } else {
                return Ok(());
            }
        }
        log::warn!("tour did not settle after {limit} rounds");
        Err(RuntimeError::RenderLoop { passes: limit })
    }

    /// Presses `label` on the first instance named `component`. Returns false
    /// when no such button is on screen.
    pub fn press(&mut self, component: &str, label: &str) -> Result<bool, RuntimeError> {
        self.press_together(&[(component, label)])
    }

    /// Presses several buttons inside a single task, so their writes batch.
    pub fn press_together(&mut self, presses: &[(&str, &str)]) -> Result<bool, RuntimeError> {
        let mut clicks = Vec::with_capacity(presses.len());
        for (component, label) in presses {
            let button = self
                .frame(component)
                .and_then(|frame| frame.find_button(label));
            match button {
                Some(button) => clicks.push(button.on_click.clone()),
                None => {
                    log::warn!("no button {label:?} on {component}");
                    return Ok(false);
                }
            }
            log::info!("press {component} / {label}");
        }
        self.runtime.run_task(|| {
            for click in &clicks {
                click.call(());
            }
        })?;
        self.settle()?;
        Ok(true)
    }

    /// First instance named `component`, in tree order.
    pub fn find(&self, component: &str) -> Option<InstanceId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.runtime.name_of(id) == Some(component) {
                return Some(id);
            }
            let children = self.runtime.children_of(id).unwrap_or_default();
            stack.extend(children.into_iter().rev());
        }
        None
    }

    pub fn frame(&self, component: &str) -> Option<&Frame> {
        self.find(component)
            .and_then(|id| self.runtime.host().output(id))
    }

    pub fn render_count(&self, component: &str) -> usize {
        self.find(component)
            .map_or(0, |id| self.runtime.host().render_count(id))
    }

    /// One indented line per mounted instance.
    pub fn snapshot(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.snapshot_into(self.root, 0, &mut lines);
        lines
    }

    fn snapshot_into(&self, id: InstanceId, depth: usize, lines: &mut Vec<String>) {
        let name = self.runtime.name_of(id).unwrap_or("?");
        let frame = self
            .runtime
            .host()
            .output(id)
            .map(ToString::to_string)
            .unwrap_or_default();
        lines.push(format!("{}{name}: {frame}", "  ".repeat(depth)));
        for child in self.runtime.children_of(id).unwrap_or_default() {
            self.snapshot_into(child, depth + 1, lines);
        }
    }
}

#[cfg(test)]
#[path = "tests/tour_tests.rs"]
mod tour_tests;
