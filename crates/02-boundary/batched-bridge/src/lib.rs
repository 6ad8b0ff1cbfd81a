//! Per-thread access point the host uses to reach the message queue.
//!
//! The host side only ever sees the four entry points below. The queue behind
//! them is installed once at startup and may be replaced for reconfiguration.

use std::cell::RefCell;
use std::rc::Rc;

use bridge_queue::{BridgeError, FlushedQueue, MessageQueue, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("no message queue is installed on this thread")]
    NotInstalled,
    #[error("a message queue is already installed on this thread")]
    AlreadyInstalled,
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type BoundaryResult<T> = Result<T, BoundaryError>;

thread_local! {
    static BRIDGE: RefCell<Option<Rc<MessageQueue>>> = RefCell::new(None);
}

/// Installs `queue` as this thread's bridge.
pub fn install(queue: MessageQueue) -> BoundaryResult<Rc<MessageQueue>> {
    BRIDGE.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(BoundaryError::AlreadyInstalled);
        }
        let queue = Rc::new(queue);
        *slot = Some(Rc::clone(&queue));
        tracing::debug!("message queue installed");
        Ok(queue)
    })
}

/// Installs `queue`, returning whichever queue it displaced.
pub fn replace(queue: MessageQueue) -> (Rc<MessageQueue>, Option<Rc<MessageQueue>>) {
    let queue = Rc::new(queue);
    let previous = BRIDGE.with(|slot| slot.borrow_mut().replace(Rc::clone(&queue)));
    tracing::debug!(replaced = previous.is_some(), "message queue replaced");
    (queue, previous)
}

pub fn uninstall() -> Option<Rc<MessageQueue>> {
    BRIDGE.with(|slot| slot.borrow_mut().take())
}

pub fn is_installed() -> bool {
    BRIDGE.with(|slot| slot.borrow().is_some())
}

/// The installed queue.
///
/// The handle is cloned out of the slot, so callers (and handlers running
/// under them) may call back into this module freely.
pub fn bridge() -> BoundaryResult<Rc<MessageQueue>> {
    BRIDGE
        .with(|slot| slot.borrow().clone())
        .ok_or(BoundaryError::NotInstalled)
}

pub fn call_function_return_flushed_queue(
    module: &str,
    method: &str,
    args: Vec<Value>,
) -> BoundaryResult<Option<FlushedQueue>> {
    Ok(bridge()?.call_function_return_flushed_queue(module, method, args)?)
}

pub fn call_function_return_result_and_flushed_queue(
    module: &str,
    method: &str,
    args: Vec<Value>,
) -> BoundaryResult<(Option<Value>, Option<FlushedQueue>)> {
    Ok(bridge()?.call_function_return_result_and_flushed_queue(module, method, args)?)
}

pub fn invoke_callback_and_return_flushed_queue(
    encoded_id: u64,
    args: Vec<Value>,
) -> BoundaryResult<Option<FlushedQueue>> {
    Ok(bridge()?.invoke_callback_and_return_flushed_queue(encoded_id, args)?)
}

pub fn flushed_queue() -> BoundaryResult<Option<FlushedQueue>> {
    Ok(bridge()?.flushed_queue()?)
}
