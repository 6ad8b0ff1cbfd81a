//! Script-side modules the replay tool installs.
//!
//! `Echo` is registered eagerly, `Counter` lazily, and `Timers` feeds the
//! immediates hook. Outbound calls go to two pretend host modules.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{bail, Result};
use bridge_queue::{render_args, CallableModule, MessageQueue, MethodTable, Value};

pub const ECHO_HOST: u32 = 0;
pub const ECHO_SEND: u32 = 0;
pub const ECHO_ACK: u32 = 1;

pub const TIMER_HOST: u32 = 1;
pub const TIMER_FIRED: u32 = 0;

/// Registers the demo modules on `queue` and installs it as this thread's
/// bridge.
pub fn install(queue: MessageQueue) -> Result<Rc<MessageQueue>> {
    queue.create_debug_lookup(ECHO_HOST, "EchoHost", ["send", "ack"]);
    queue.create_debug_lookup(TIMER_HOST, "TimerHost", ["fired"]);

    queue.register_callable_module("Echo", echo_module());
    queue.register_lazy_callable_module("Counter", || {
        tracing::info!("creating Counter");
        Rc::new(Counter::default())
    });

    let timers = Rc::new(Timers::default());
    queue.register_callable_module("Timers", timers.clone());
    queue.set_immediates_callback(move || timers.fire());

    Ok(batched_bridge::install(queue)?)
}

/// `ping` asks the host to send its arguments back; the reply is acknowledged.
fn echo_module() -> Rc<dyn CallableModule> {
    MethodTable::new()
        .method("ping", |args| {
            batched_bridge::bridge()?.enqueue_host_call(
                ECHO_HOST,
                ECHO_SEND,
                args,
                Some(Box::new(|reason: Vec<Value>| -> Result<()> {
                    tracing::warn!(reason = %render_args(&reason), "host rejected ping");
                    Ok(())
                })),
                Some(Box::new(|reply: Vec<Value>| -> Result<()> {
                    batched_bridge::bridge()?.enqueue_host_call(ECHO_HOST, ECHO_ACK, reply, None, None)?;
                    Ok(())
                })),
            )?;
            Ok(Value::Undefined)
        })
        .into_module()
}

#[derive(Default)]
struct Counter {
    count: Cell<f64>,
}

impl CallableModule for Counter {
    fn has_method(&self, method: &str) -> bool {
        matches!(method, "increment" | "reset")
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match method {
            "increment" => {
                let by = args.first().and_then(Value::as_f64).unwrap_or(1.0);
                self.count.set(self.count.get() + by);
            }
            "reset" => self.count.set(0.0),
            other => bail!("Counter has no method {other}"),
        }
        Ok(Value::from(self.count.get()))
    }
}

/// Work scheduled with `setImmediate` is sent to the host on the next drain.
#[derive(Default)]
struct Timers {
    pending: RefCell<Vec<Vec<Value>>>,
}

impl Timers {
    fn fire(&self) -> Result<()> {
        let due = self.pending.take();
        if due.is_empty() {
            return Ok(());
        }
        let bridge = batched_bridge::bridge()?;
        for args in due {
            bridge.enqueue_host_call(TIMER_HOST, TIMER_FIRED, args, None, None)?;
        }
        Ok(())
    }
}

impl CallableModule for Timers {
    fn has_method(&self, method: &str) -> bool {
        method == "setImmediate"
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        if method != "setImmediate" {
            bail!("Timers has no method {method}");
        }
        let mut pending = self.pending.borrow_mut();
        pending.push(args);
        Ok(Value::from(pending.len()))
    }
}
