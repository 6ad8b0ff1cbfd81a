//! Correlation of pending outbound calls with their completion callbacks.

use std::collections::HashMap;

use crate::callback_id::{CallbackId, CallbackKind};
use crate::value::Value;

/// Completion callback for an outbound call. Runs at most once.
pub type Callback = Box<dyn FnOnce(Vec<Value>) -> anyhow::Result<()>>;

/// Success and failure callbacks keyed by call id.
///
/// Both slots for a call id are written together when the call is enqueued
/// and removed together when the call resolves, so a call id resolves at most
/// once no matter which kind arrives first.
#[derive(Default)]
pub struct CallbackRegistry {
    success: HashMap<u64, Option<Callback>>,
    failure: HashMap<u64, Option<Callback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, call_id: u64, on_fail: Option<Callback>, on_succ: Option<Callback>) {
        self.success.insert(call_id, on_succ);
        self.failure.insert(call_id, on_fail);
    }

    /// Returns true if a callback of the given kind is waiting for `id`.
    pub fn contains(&self, id: CallbackId) -> bool {
        matches!(self.slots(id.kind).get(&id.call_id), Some(Some(_)))
    }

    /// Takes the callback for `id`, clearing both slots of its call.
    ///
    /// Leaves the registry untouched when no callback of that kind exists.
    pub fn take(&mut self, id: CallbackId) -> Option<Callback> {
        if !self.contains(id) {
            return None;
        }
        let succ = self.success.remove(&id.call_id).flatten();
        let fail = self.failure.remove(&id.call_id).flatten();
        match id.kind {
            CallbackKind::Success => succ,
            CallbackKind::Failure => fail,
        }
    }

    /// Number of calls still waiting for resolution.
    pub fn pending(&self) -> usize {
        self.success.len()
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_empty()
    }

    fn slots(&self, kind: CallbackKind) -> &HashMap<u64, Option<Callback>> {
        match kind {
            CallbackKind::Success => &self.success,
            CallbackKind::Failure => &self.failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> Callback {
        let log = Rc::clone(log);
        Box::new(move |_| {
            log.borrow_mut().push(tag);
            Ok(())
        })
    }

    #[test]
    fn take_clears_both_slots() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        registry.register(0, Some(recording(&log, "fail")), Some(recording(&log, "succ")));
        assert_eq!(registry.pending(), 1);

        let cb = registry.take(CallbackId::success(0)).expect("success callback");
        cb(Vec::new()).expect("callback ok");

        assert!(registry.is_empty());
        assert!(registry.take(CallbackId::failure(0)).is_none());
        assert_eq!(*log.borrow(), vec!["succ"]);
    }

    #[test]
    fn missing_kind_leaves_call_pending() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        registry.register(4, None, Some(recording(&log, "succ")));

        assert!(registry.take(CallbackId::failure(4)).is_none());
        assert!(registry.contains(CallbackId::success(4)));
        assert!(registry.take(CallbackId::success(4)).is_some());
    }
}
