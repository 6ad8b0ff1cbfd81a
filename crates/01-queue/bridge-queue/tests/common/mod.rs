//! Shared fixtures for the queue integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use bridge_queue::{
    BridgeError, Callback, FlushedQueue, MessageQueue, QueueConfig, Tracer, Value,
};

/// Arguments seen by every invocation of a recording callback.
pub type CallLog = Rc<RefCell<Vec<Vec<Value>>>>;

pub fn dev_queue() -> MessageQueue {
    MessageQueue::new(QueueConfig::development())
}

pub fn prod_queue() -> MessageQueue {
    MessageQueue::new(QueueConfig::production())
}

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn recording_callback(log: &CallLog) -> Option<Callback> {
    let log = Rc::clone(log);
    Some(Box::new(move |args: Vec<Value>| -> anyhow::Result<()> {
        log.borrow_mut().push(args);
        Ok(())
    }))
}

/// Collects reported fatal errors as display strings.
#[derive(Clone, Default)]
pub struct ErrorLog(pub Rc<RefCell<Vec<String>>>);

impl ErrorLog {
    pub fn reporter(&self) -> impl Fn(&BridgeError) + 'static {
        let errors = Rc::clone(&self.0);
        move |err: &BridgeError| errors.borrow_mut().push(err.to_string())
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// Collects batches handed to the flush sink.
#[derive(Clone, Default)]
pub struct SinkLog(pub Rc<RefCell<Vec<FlushedQueue>>>);

impl SinkLog {
    pub fn sink(&self) -> impl Fn(FlushedQueue) + 'static {
        let batches = Rc::clone(&self.0);
        move |batch: FlushedQueue| batches.borrow_mut().push(batch)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn batch_lens(&self) -> Vec<usize> {
        self.0.borrow().iter().map(FlushedQueue::len).collect()
    }
}

/// Tracer that records every event as a line of text.
#[derive(Default)]
pub struct RecordingTracer {
    pub events: RefCell<Vec<String>>,
}

impl RecordingTracer {
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl Tracer for RecordingTracer {
    fn begin_event(&self, name: &str) {
        self.events.borrow_mut().push(format!("begin {name}"));
    }

    fn end_event(&self) {
        self.events.borrow_mut().push("end".to_owned());
    }

    fn counter_event(&self, name: &str, value: i64) {
        self.events
            .borrow_mut()
            .push(format!("counter {name}={value}"));
    }

    fn begin_async_flow(&self, name: &str, cookie: u64) {
        self.events
            .borrow_mut()
            .push(format!("flow {name}#{cookie}"));
    }
}

pub fn strings(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}
