//! External collaborators of the queue.
//!
//! Each is injected at construction so several independent queues can live
//! side by side (tests do this heavily).

use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::error::BridgeError;
use crate::queue::FlushedQueue;

/// Receives batches pushed by the auto-flush throttle.
pub trait FlushSink {
    fn flush_queue_immediate(&self, queue: FlushedQueue);
}

impl<F: Fn(FlushedQueue)> FlushSink for F {
    fn flush_queue_immediate(&self, queue: FlushedQueue) {
        self(queue)
    }
}

/// Receives failures caught by guarded entry points.
pub trait FatalErrorReporter {
    fn report_fatal_error(&self, error: &BridgeError);
}

impl<F: Fn(&BridgeError)> FatalErrorReporter for F {
    fn report_fatal_error(&self, error: &BridgeError) {
        self(error)
    }
}

/// Logs fatal errors through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl FatalErrorReporter for LogReporter {
    fn report_fatal_error(&self, error: &BridgeError) {
        tracing::error!(contract = error.is_contract_violation(), "{error}");
    }
}

/// Span and counter sink for call tracing.
pub trait Tracer {
    fn begin_event(&self, name: &str);

    fn end_event(&self);

    fn counter_event(&self, name: &str, value: i64);

    /// Marks the start of an asynchronous flow keyed by `cookie`.
    fn begin_async_flow(&self, _name: &str, _cookie: u64) {}
}

/// Emits trace events as `tracing` records under the `bridge_queue::trace` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn begin_event(&self, name: &str) {
        tracing::trace!(target: "bridge_queue::trace", "begin {name}");
    }

    fn end_event(&self) {
        tracing::trace!(target: "bridge_queue::trace", "end");
    }

    fn counter_event(&self, name: &str, value: i64) {
        tracing::trace!(target: "bridge_queue::trace", counter = name, value);
    }

    fn begin_async_flow(&self, name: &str, cookie: u64) {
        tracing::trace!(target: "bridge_queue::trace", flow = name, cookie, "begin async flow");
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn begin_event(&self, _name: &str) {}

    fn end_event(&self) {}

    fn counter_event(&self, _name: &str, _value: i64) {}
}

/// Tells guarded entry points whether a debugger wants failures to surface
/// at their origin.
pub trait DebuggerProbe {
    fn should_pause_on_throw(&self) -> bool;
}

/// Settable pause-on-throw flag, initially off.
#[derive(Debug, Default)]
pub struct DebuggerState {
    pause_on_throw: Cell<bool>,
}

impl DebuggerState {
    pub fn new(pause_on_throw: bool) -> Self {
        Self {
            pause_on_throw: Cell::new(pause_on_throw),
        }
    }

    pub fn set_pause_on_throw(&self, enabled: bool) {
        self.pause_on_throw.set(enabled);
    }
}

impl DebuggerProbe for DebuggerState {
    fn should_pause_on_throw(&self) -> bool {
        self.pause_on_throw.get()
    }
}

/// Monotonic time source measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
