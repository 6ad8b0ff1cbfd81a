//! The batching queue sitting between the script context and the host.
//!
//! Outbound calls accumulate in a [`PendingQueue`] until the host drains it,
//! or until the auto-flush throttle hands a batch to the [`FlushSink`].
//! Inbound calls and callback completions enter through guarded entry points
//! and may enqueue further outbound calls while they run.
//!
//! Everything runs on one thread. State lives in `Cell`/`RefCell`s and no
//! borrow is held while user code runs, which is what makes reentrant
//! enqueues from handlers, callbacks, and the immediates hook safe.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::callback_id::CallbackId;
use crate::callbacks::{Callback, CallbackRegistry};
use crate::config::QueueConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{BridgeError, BridgeResult};
use crate::guard::guard;
use crate::hooks::{
    Clock, DebuggerProbe, DebuggerState, FatalErrorReporter, FlushSink, LogReporter, LogTracer,
    SystemClock, Tracer,
};
use crate::modules::{CallableModule, ModuleRegistry, Resolution};
use crate::queue::{FlushedQueue, PendingQueue};
use crate::spy::{Direction, MethodLabel, Spy, SpyData};
use crate::validate::validate_params;
use crate::value::{render_args, Value};

/// Trace counter carrying the outbound queue depth.
pub const PENDING_QUEUE_COUNTER: &str = "pending_script_to_host_queue";

pub type ImmediatesCallback = Rc<dyn Fn() -> anyhow::Result<()>>;

pub struct MessageQueue {
    config: QueueConfig,
    queue: RefCell<PendingQueue>,
    next_call_id: Cell<u64>,
    callbacks: RefCell<CallbackRegistry>,
    modules: RefCell<ModuleRegistry>,
    last_flush: Cell<Option<Duration>>,
    draining: Cell<bool>,
    event_loop_start: Cell<Duration>,
    immediates: RefCell<Option<ImmediatesCallback>>,
    diagnostics: Option<RefCell<Diagnostics>>,
    spy: RefCell<Option<Spy>>,
    flush_sink: Option<Box<dyn FlushSink>>,
    reporter: Box<dyn FatalErrorReporter>,
    tracer: Rc<dyn Tracer>,
    debugger: Rc<dyn DebuggerProbe>,
    clock: Rc<dyn Clock>,
}

impl MessageQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> MessageQueueBuilder {
        MessageQueueBuilder::new()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Queues a call to host method `method_id` of host module `module_id`.
    ///
    /// When callbacks are supplied their encoded ids are appended to
    /// `params`, failure first. With diagnostics on, `params` is validated
    /// before anything is queued.
    pub fn enqueue_host_call(
        &self,
        module_id: u32,
        method_id: u32,
        mut params: Vec<Value>,
        on_fail: Option<Callback>,
        on_succ: Option<Callback>,
    ) -> BridgeResult<()> {
        if self.config.diagnostics {
            validate_params(&params)?;
        }

        let call_id = self.next_call_id.get();
        if on_fail.is_some() || on_succ.is_some() {
            if let Some(diag) = &self.diagnostics {
                diag.borrow_mut().record_call(call_id, module_id, method_id);
            }
            if on_fail.is_some() {
                params.push(Value::from(CallbackId::failure(call_id).encode()));
            }
            if on_succ.is_some() {
                params.push(Value::from(CallbackId::success(call_id).encode()));
            }
            self.callbacks
                .borrow_mut()
                .register(call_id, on_fail, on_succ);
        }
        if self.config.diagnostics {
            self.tracer.begin_async_flow("host", call_id);
        }
        self.next_call_id.set(call_id + 1);

        let spied_args = self.has_spy().then(|| params.clone());
        self.queue.borrow_mut().push(module_id, method_id, params);
        self.auto_flush();

        let depth = self.queue.borrow().len();
        self.tracer
            .counter_event(PENDING_QUEUE_COUNTER, depth as i64);
        if let Some(args) = spied_args {
            self.notify_outbound(module_id, method_id, args);
        }
        Ok(())
    }

    /// Detaches everything queued so far.
    ///
    /// The immediates callback runs first, under the guard, so work it
    /// enqueues lands in the same batch. Auto-flush is held off until the
    /// swap. Returns `None` when there is nothing to send.
    pub fn drain(&self) -> BridgeResult<Option<FlushedQueue>> {
        {
            let _draining = DrainScope::enter(&self.draining);
            self.guarded("immediates", || self.call_immediates())?;
        }
        let flushed = self.swap_queue();
        Ok((!flushed.is_empty()).then_some(flushed))
    }

    /// Dispatches an inbound call to a registered module.
    pub fn call_function(&self, module: &str, method: &str, args: Vec<Value>) -> BridgeResult<Value> {
        self.mark_activity();
        let spying = self.has_spy();
        let label = if self.config.diagnostics || spying {
            format!("{module}.{method}({})", render_args(&args))
        } else {
            format!("{module}.{method}(...)")
        };
        let _scope = TraceScope::begin(self.tracer.as_ref(), &label);

        if spying {
            self.notify(SpyData {
                direction: Direction::ToScript,
                module: Some(module.to_owned()),
                method: MethodLabel::Name(method.to_owned()),
                args: args.clone(),
            });
        }

        let target =
            self.get_callable_module(module)
                .ok_or_else(|| BridgeError::ModuleNotRegistered {
                    module: module.to_owned(),
                    method: method.to_owned(),
                })?;
        if !target.has_method(method) {
            return Err(BridgeError::MethodNotFound {
                module: module.to_owned(),
                method: method.to_owned(),
            });
        }
        target
            .invoke(method, args)
            .map_err(|source| BridgeError::handler(format!("{module}.{method}"), source))
    }

    /// Completes a pending outbound call.
    ///
    /// Both callbacks of the call are dropped before the chosen one runs. An
    /// unknown or already consumed id is an error with diagnostics on and a
    /// no-op otherwise.
    pub fn invoke_callback(&self, encoded_id: u64, args: Vec<Value>) -> BridgeResult<()> {
        self.mark_activity();
        let id = CallbackId::decode(encoded_id);
        let label = self
            .diagnostics
            .as_ref()
            .and_then(|diag| diag.borrow().label_call(id.call_id));

        let callback = self.callbacks.borrow_mut().take(id);
        let Some(callback) = callback else {
            if !self.config.diagnostics {
                return Ok(());
            }
            let label = label.unwrap_or_default();
            return Err(BridgeError::CallbackNotFound {
                id: encoded_id,
                module: label.module,
                method: label.method,
            });
        };

        let profile_name = match &label {
            Some(label) => format!(
                "<callback for {}.{}>",
                label.module.as_deref().unwrap_or("?"),
                label.method.as_deref().unwrap_or("?")
            ),
            None => encoded_id.to_string(),
        };
        if self.has_spy() {
            let method = match label {
                Some(_) => MethodLabel::Name(profile_name.clone()),
                None => MethodLabel::Id(encoded_id),
            };
            self.notify(SpyData {
                direction: Direction::ToScript,
                module: None,
                method,
                args: args.clone(),
            });
        }

        let trace_label = if self.config.diagnostics {
            format!("invokeCallback({profile_name}, {})", render_args(&args))
        } else {
            format!("invokeCallback({profile_name})")
        };
        let _scope = TraceScope::begin(self.tracer.as_ref(), &trace_label);
        callback(args)
            .map_err(|source| BridgeError::handler(format!("callback {profile_name}"), source))
    }

    /// Host entry point: run an inbound call, then drain.
    pub fn call_function_return_flushed_queue(
        &self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> BridgeResult<Option<FlushedQueue>> {
        self.guarded(&format!("{module}.{method}"), || {
            self.call_function(module, method, args)
        })?;
        self.drain()
    }

    /// Host entry point: run an inbound call, then drain, returning both the
    /// call's result (`None` if it failed under the guard) and the batch.
    pub fn call_function_return_result_and_flushed_queue(
        &self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> BridgeResult<(Option<Value>, Option<FlushedQueue>)> {
        let result = self.guarded(&format!("{module}.{method}"), || {
            self.call_function(module, method, args)
        })?;
        Ok((result, self.drain()?))
    }

    /// Host entry point: complete a callback, then drain.
    pub fn invoke_callback_and_return_flushed_queue(
        &self,
        encoded_id: u64,
        args: Vec<Value>,
    ) -> BridgeResult<Option<FlushedQueue>> {
        self.guarded(&format!("callback {encoded_id}"), || {
            self.invoke_callback(encoded_id, args)
        })?;
        self.drain()
    }

    /// Host entry point: drain without an inbound call.
    pub fn flushed_queue(&self) -> BridgeResult<Option<FlushedQueue>> {
        self.drain()
    }

    /// Registers the single hook run at the start of every drain, replacing
    /// any previous one.
    pub fn set_immediates_callback<F>(&self, callback: F)
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        self.immediates.replace(Some(Rc::new(callback)));
    }

    pub fn register_callable_module(&self, name: impl Into<String>, module: Rc<dyn CallableModule>) {
        let name = name.into();
        tracing::debug!(module = %name, "registered callable module");
        self.modules.borrow_mut().register(name, module);
    }

    pub fn register_lazy_callable_module<F>(&self, name: impl Into<String>, factory: F)
    where
        F: FnOnce() -> Rc<dyn CallableModule> + 'static,
    {
        let name = name.into();
        tracing::debug!(module = %name, "registered lazy callable module");
        self.modules.borrow_mut().register_lazy(name, factory);
    }

    /// Resolves a module by name, materialising a lazy one on first use.
    pub fn get_callable_module(&self, name: &str) -> Option<Rc<dyn CallableModule>> {
        let resolution = self.modules.borrow_mut().begin_resolve(name);
        match resolution {
            Resolution::Ready(module) => Some(module),
            Resolution::Pending(factory) => {
                tracing::debug!(module = name, "materialising lazy callable module");
                let module = factory();
                Some(self.modules.borrow_mut().finish_resolve(name, module))
            }
            Resolution::Missing => None,
        }
    }

    /// Records names for a host module so errors and spies can show them.
    /// Does nothing without diagnostics.
    pub fn create_debug_lookup<I, S>(&self, module_id: u32, name: impl Into<String>, methods: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(diag) = &self.diagnostics {
            diag.borrow_mut().create_debug_lookup(
                module_id,
                name.into(),
                methods.into_iter().map(Into::into).collect(),
            );
        }
    }

    /// Installs (or with `None`, removes) the observer hook and returns the
    /// previous one.
    pub fn install_spy(&self, spy: Option<Spy>) -> Option<Spy> {
        self.spy.replace(spy)
    }

    /// Time since the last inbound call or callback.
    pub fn event_loop_running_time(&self) -> Duration {
        self.clock
            .now()
            .saturating_sub(self.event_loop_start.get())
    }

    pub fn pending_calls(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.borrow().pending()
    }

    /// Call id the next enqueue will receive.
    pub fn next_call_id(&self) -> u64 {
        self.next_call_id.get()
    }

    fn guarded<T>(&self, label: &str, body: impl FnOnce() -> BridgeResult<T>) -> BridgeResult<Option<T>> {
        guard(self.debugger.as_ref(), self.reporter.as_ref(), label, body)
    }

    fn call_immediates(&self) -> BridgeResult<()> {
        let _scope = TraceScope::begin(self.tracer.as_ref(), "callImmediates()");
        let callback = self.immediates.borrow().clone();
        match callback {
            Some(callback) => {
                callback().map_err(|source| BridgeError::handler("immediates callback", source))
            }
            None => Ok(()),
        }
    }

    fn auto_flush(&self) {
        let Some(sink) = &self.flush_sink else {
            return;
        };
        if self.draining.get() {
            return;
        }
        let now = self.clock.now();
        let due = self
            .last_flush
            .get()
            .map_or(true, |last| now.saturating_sub(last) >= self.config.min_flush_interval());
        if !due {
            return;
        }
        let flushed = self.swap_queue();
        self.last_flush.set(Some(now));
        sink.flush_queue_immediate(flushed);
    }

    fn swap_queue(&self) -> FlushedQueue {
        self.queue.borrow_mut().swap(self.next_call_id.get())
    }

    fn mark_activity(&self) {
        let now = self.clock.now();
        self.last_flush.set(Some(now));
        self.event_loop_start.set(now);
    }

    fn has_spy(&self) -> bool {
        self.spy.borrow().is_some()
    }

    fn notify(&self, data: SpyData) {
        let spy = self.spy.borrow().clone();
        if let Some(spy) = spy {
            spy(&data);
        }
    }

    fn notify_outbound(&self, module_id: u32, method_id: u32, args: Vec<Value>) {
        let names = self.diagnostics.as_ref().map(|diag| {
            let diag = diag.borrow();
            (
                diag.module_name(module_id).map(str::to_owned),
                diag.method_name(module_id, method_id).map(str::to_owned),
            )
        });
        let (module, method) = names.unwrap_or_default();
        self.notify(SpyData {
            direction: Direction::ToHost,
            module: Some(module.unwrap_or_else(|| module_id.to_string())),
            method: method.map_or(MethodLabel::Id(method_id.into()), MethodLabel::Name),
            args,
        });
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("config", &self.config)
            .field("pending_calls", &self.pending_calls())
            .field("pending_callbacks", &self.pending_callbacks())
            .field("next_call_id", &self.next_call_id())
            .finish_non_exhaustive()
    }
}

/// Ends a trace event on drop so spans stay balanced when a body fails.
struct TraceScope<'a> {
    tracer: &'a dyn Tracer,
}

impl<'a> TraceScope<'a> {
    fn begin(tracer: &'a dyn Tracer, name: &str) -> Self {
        tracer.begin_event(name);
        Self { tracer }
    }
}

impl Drop for TraceScope<'_> {
    fn drop(&mut self) {
        self.tracer.end_event();
    }
}

/// Marks a drain in progress until dropped.
struct DrainScope<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> DrainScope<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for DrainScope<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Builder for [`MessageQueue`]. Unset collaborators fall back to the
/// logging reporter and tracer, a system clock, and a debugger that never
/// pauses. Without a flush sink auto-flush is off.
pub struct MessageQueueBuilder {
    config: QueueConfig,
    flush_sink: Option<Box<dyn FlushSink>>,
    reporter: Option<Box<dyn FatalErrorReporter>>,
    tracer: Option<Rc<dyn Tracer>>,
    debugger: Option<Rc<dyn DebuggerProbe>>,
    clock: Option<Rc<dyn Clock>>,
}

impl MessageQueueBuilder {
    pub fn new() -> Self {
        Self {
            config: QueueConfig::default(),
            flush_sink: None,
            reporter: None,
            tracer: None,
            debugger: None,
            clock: None,
        }
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn flush_sink(mut self, sink: impl FlushSink + 'static) -> Self {
        self.flush_sink = Some(Box::new(sink));
        self
    }

    pub fn reporter(mut self, reporter: impl FatalErrorReporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    pub fn tracer(mut self, tracer: Rc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn debugger(mut self, debugger: Rc<dyn DebuggerProbe>) -> Self {
        self.debugger = Some(debugger);
        self
    }

    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> MessageQueue {
        let clock = self
            .clock
            .unwrap_or_else(|| Rc::new(SystemClock::new()));
        let diagnostics = self
            .config
            .diagnostics
            .then(|| RefCell::new(Diagnostics::new(self.config.debug_info_limit)));
        MessageQueue {
            queue: RefCell::new(PendingQueue::new(0)),
            next_call_id: Cell::new(0),
            callbacks: RefCell::new(CallbackRegistry::new()),
            modules: RefCell::new(ModuleRegistry::new()),
            last_flush: Cell::new(None),
            draining: Cell::new(false),
            event_loop_start: Cell::new(clock.now()),
            immediates: RefCell::new(None),
            diagnostics,
            spy: RefCell::new(None),
            flush_sink: self.flush_sink,
            reporter: self.reporter.unwrap_or_else(|| Box::new(LogReporter)),
            tracer: self.tracer.unwrap_or_else(|| Rc::new(LogTracer)),
            debugger: self
                .debugger
                .unwrap_or_else(|| Rc::new(DebuggerState::default())),
            clock,
            config: self.config,
        }
    }
}

impl Default for MessageQueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}
