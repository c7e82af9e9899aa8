//! Host scheduling hooks for the runtime.
//!
//! The runtime never drives its own loop. When work shows up outside of a
//! task it asks the host, through this trait, to come back and flush it.

/// Lets the host learn that the runtime has deferred work.
///
/// Both callbacks are notifications only: the runtime expects the host to call
/// back into [`Runtime::flush`](crate::Runtime::flush) or
/// [`Runtime::flush_passive_effects`](crate::Runtime::flush_passive_effects)
/// at its next convenient point.
pub trait RuntimeScheduler {
    /// State writes were queued while no task was running.
    fn schedule_flush(&self);

    /// A commit left passive effects waiting for the host's idle point.
    fn schedule_passive(&self);
}

/// Scheduler that ignores every request; hosts poll the runtime instead.
#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_flush(&self) {}

    fn schedule_passive(&self) {}
}
